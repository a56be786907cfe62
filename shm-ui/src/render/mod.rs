//! HTML rendering helpers
//!
//! Pages are rendered server-side into plain HTML strings. The shared layout
//! carries the sidebar navigation and the build identification header.

pub mod chart;
pub mod map;

use crate::api::buildinfo::BUILD_INFO;
use crate::navigation::Page;

/// One-line message shown above page content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Warning(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Success(msg) | Notice::Warning(msg) | Notice::Error(msg) => msg,
        }
    }

    fn class(&self) -> &'static str {
        match self {
            Notice::Success(_) => "notice-success",
            Notice::Warning(_) => "notice-warning",
            Notice::Error(_) => "notice-error",
        }
    }

    pub fn to_html(&self) -> String {
        format!(
            "<div class=\"notice {}\">{}</div>\n",
            self.class(),
            self.message()
        )
    }
}

/// Escape text for HTML element content and quoted attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Wrap page content in the full document with sidebar navigation
pub fn layout(active: Page, content: &str) -> String {

    let nav: String = Page::ALL
        .iter()
        .map(|page| {
            let class = if *page == active { " class=\"active\"" } else { "" };
            format!(
                "      <li><a href=\"/page/{}\"{}>{}</a></li>\n",
                page.slug(),
                class,
                page.title()
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Soil Health Monitoring - {title}</title>
    <link rel="stylesheet" href="/static/shm.css">
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
</head>
<body>
  <aside class="sidebar">
    <h2>Navigation</h2>
    <ul>
{nav}    </ul>
    <div class="build-info">shm-ui {build}</div>
  </aside>
  <main class="content">
{content}
  </main>
</body>
</html>
"#,
        title = active.title(),
        nav = nav,
        build = BUILD_INFO,
        content = content,
    )
}
