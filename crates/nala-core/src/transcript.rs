//! HTML rendering of a session, with hover tooltips for glossary terms
//!
//! Assistant prose is annotated and rendered with raw HTML allowed so the
//! tooltip spans survive. Replies containing a Markdown table are rendered
//! with raw HTML disallowed and left to the Markdown table renderer.

use anyhow::{Context, Result};
use askama::Template;
use markdown::{to_html_with_options, Options as MarkdownOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use crate::annotate::{annotate, contains_markdown_table, escape_html};
use crate::glossary::Glossary;
use crate::persona;
use crate::state::{ChatRole, Conversation};

const STYLE: &str = r#"
body { background: #0e1117; color: #fafafa; font-family: sans-serif; max-width: 720px; margin: 40px auto; }
.big-nala { font-size: 36px; font-weight: 700; text-align: center; color: white; margin-bottom: 16px; }
.response-box, .user-box { border-radius: 8px; padding: 12px 16px; margin: 12px 0; }
.response-box { background: #262730; }
.user-box { background: #1b3a57; }
.tooltip-term {
    background: #ffe066;
    color: #222;
    border-radius: 4px;
    padding: 0 3px;
    cursor: pointer;
    position: relative;
    display: inline-block;
}
.tooltip-text {
    visibility: hidden;
    opacity: 0;
    width: 220px;
    background: #222;
    color: #fff;
    text-align: left;
    border-radius: 6px;
    padding: 8px 12px;
    position: absolute;
    z-index: 1000;
    left: 50%;
    top: 120%;
    transform: translateX(-50%);
    transition: opacity 0.2s;
    font-size: 0.95em;
    box-shadow: 0 2px 8px rgba(0,0,0,0.15);
    white-space: normal;
}
.tooltip-term:hover .tooltip-text { visibility: visible; opacity: 1; }
table { border-collapse: collapse; }
th, td { border: 1px solid #555; padding: 4px 8px; }
"#;

fn markdown_options(rich: bool) -> MarkdownOptions {
    let mut options = MarkdownOptions::gfm();
    // Annotated replies carry our own tooltip spans
    options.compile.allow_dangerous_html = rich;
    options
}

/// Render Markdown; `rich` lets embedded HTML through
pub fn render_markdown(text: &str, rich: bool) -> String {
    to_html_with_options(text, &markdown_options(rich)).unwrap_or_else(|_| escape_html(text))
}

/// Render one assistant reply the way the chat page shows it
pub fn render_reply(text: &str, glossary: &Glossary) -> String {
    if contains_markdown_table(text) {
        render_markdown(text, false)
    } else {
        render_markdown(&annotate(text, glossary), true)
    }
}

/// One chat bubble; `html` is already rendered Markdown
struct Bubble {
    class: &'static str,
    html: String,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{ name }} - {{ tagline }}</title>
<style>{{ style|safe }}</style>
</head>
<body>
<div class="big-nala">{{ name }}</div>
{% if let Some(greeting) = greeting %}<div class="response-box">{{ greeting }}</div>
{% endif %}{% for bubble in bubbles %}<div class="{{ bubble.class }}">{{ bubble.html|safe }}</div>
{% endfor %}{% if let Some(error) = error %}<div class="response-box">⚠️ {{ error }}</div>
{% endif %}</body>
</html>
"#,
    ext = "html"
)]
struct TranscriptPage<'a> {
    name: &'a str,
    tagline: &'a str,
    style: &'a str,
    greeting: Option<&'a str>,
    bubbles: Vec<Bubble>,
    error: Option<&'a str>,
}

/// Whole conversation as a standalone HTML page. `error` is the message of a
/// failed final turn, if any.
pub fn render_html(conversation: &Conversation, glossary: &Glossary, error: Option<&str>) -> Result<String> {
    let bubbles = conversation
        .exchanges()
        .iter()
        .filter_map(|turn| match turn.role() {
            ChatRole::User => Some(Bubble {
                class: "user-box",
                html: render_markdown(turn.content(), false),
            }),
            ChatRole::Assistant => Some(Bubble {
                class: "response-box",
                html: render_reply(turn.content(), glossary),
            }),
            ChatRole::System => None,
        })
        .collect();

    let page = TranscriptPage {
        name: persona::NAME,
        tagline: persona::TAGLINE,
        style: STYLE,
        greeting: (!conversation.has_interacted()).then_some(persona::GREETING),
        bubbles,
        error,
    };
    page.render().context("Failed to render transcript")
}

/// Write the transcript into `dir` and return the file path
pub fn export(
    conversation: &Conversation,
    glossary: &Glossary,
    error: Option<&str>,
    dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let path = dir.join(format!("nala-transcript-{}.html", stamp));

    fs::write(&path, render_html(conversation, glossary, error)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), turns = conversation.len(), "exported transcript");
    Ok(path)
}
