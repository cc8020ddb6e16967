//! Built-in default card template
//!
//! A fixed two-tone gradient card: title clamped to three lines,
//! optional description clamped to two, optional site name bottom-left,
//! optional tag chips bottom-right. Every interpolated string is
//! HTML-escaped.

use crate::cache::TemplateIdentity;
use crate::error::CardsmithResult;
use crate::template::Template;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// The built-in gradient card
#[derive(Debug, Clone, Default)]
pub struct DefaultCardTemplate;

/// Escape a string for interpolation into HTML text or attributes
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Read a string prop, treating non-strings and empty strings as absent
fn string_prop<'a>(props: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    props
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Read the tags prop, keeping only non-empty string entries
fn tag_props(props: &Map<String, Value>) -> Vec<&str> {
    props
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl DefaultCardTemplate {
    fn build_html(props: &Map<String, Value>) -> String {
        let title = string_prop(props, "title").unwrap_or("Untitled");
        let description = string_prop(props, "description");
        let site = string_prop(props, "site");
        let tags = tag_props(props);

        let mut body = String::new();
        body.push_str(&format!(
            r#"<h1 class="title">{}</h1>"#,
            escape_html(title)
        ));
        if let Some(description) = description {
            body.push_str(&format!(
                r#"<p class="description">{}</p>"#,
                escape_html(description)
            ));
        }

        let mut footer = String::new();
        if let Some(site) = site {
            footer.push_str(&format!(r#"<span class="site">{}</span>"#, escape_html(site)));
        }
        if !tags.is_empty() {
            footer.push_str(r#"<span class="tags">"#);
            for tag in tags {
                footer.push_str(&format!(r#"<span class="chip">{}</span>"#, escape_html(tag)));
            }
            footer.push_str("</span>");
        }

        format!(
            r#"<style>
  html, body {{ margin: 0; padding: 0; }}
  .card {{
    box-sizing: border-box;
    width: 100vw;
    height: 100vh;
    display: flex;
    flex-direction: column;
    justify-content: space-between;
    padding: 56px 64px;
    background: linear-gradient(135deg, #0f172a 0%, #1e3a5f 100%);
    color: #f1f5f9;
    font-family: system-ui, -apple-system, 'Segoe UI', sans-serif;
  }}
  .title {{
    margin: 0;
    font-size: 64px;
    line-height: 1.15;
    font-weight: 700;
    display: -webkit-box;
    -webkit-line-clamp: 3;
    -webkit-box-orient: vertical;
    overflow: hidden;
  }}
  .description {{
    margin: 16px 0 0;
    font-size: 30px;
    line-height: 1.4;
    color: #94a3b8;
    display: -webkit-box;
    -webkit-line-clamp: 2;
    -webkit-box-orient: vertical;
    overflow: hidden;
  }}
  .footer {{
    display: flex;
    justify-content: space-between;
    align-items: center;
    font-size: 24px;
  }}
  .site {{ color: #cbd5e1; font-weight: 600; }}
  .tags {{ display: flex; gap: 12px; margin-left: auto; }}
  .chip {{
    padding: 6px 18px;
    border-radius: 999px;
    background: rgba(148, 163, 184, 0.2);
    color: #e2e8f0;
    font-size: 22px;
  }}
</style>
<div class="card">
  <div class="main">{body}</div>
  <div class="footer">{footer}</div>
</div>"#
        )
    }
}

#[async_trait]
impl Template for DefaultCardTemplate {
    async fn render(&self, props: &Map<String, Value>) -> CardsmithResult<String> {
        Ok(Self::build_html(props))
    }

    fn identity(&self) -> TemplateIdentity {
        TemplateIdentity::Builtin
    }
}
