use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;

use crate::config::DEFAULT_PROMPT_TEMPLATE;

const TEMPLATE_NAME: &str = "prompt";

#[derive(Debug, Serialize)]
struct PromptContext<'a> {
    topic: &'a str,
}

fn renderer() -> Handlebars<'static> {
    let mut renderer = Handlebars::new();
    renderer.set_strict_mode(false);
    // Prompts are plain text; HTML escaping would mangle quotes in the topic.
    renderer.register_escape_fn(handlebars::no_escape);
    renderer
}

fn render_template(template: &str, topic: &str) -> Option<String> {
    let mut renderer = renderer();
    if renderer
        .register_template_string(TEMPLATE_NAME, template)
        .is_err()
    {
        return None;
    }

    renderer
        .render(TEMPLATE_NAME, &PromptContext { topic })
        .ok()
        .filter(|rendered| !rendered.trim().is_empty())
}

pub fn validate_template(template: &str) -> Result<()> {
    renderer()
        .register_template_string(TEMPLATE_NAME, template)
        .context("invalid template syntax")?;
    Ok(())
}

pub fn render_prompt(template: &str, topic: &str) -> String {
    if let Some(prompt) = render_template(template, topic) {
        return prompt;
    }

    tracing::warn!("prompt template unusable; falling back to the built-in one");
    render_template(DEFAULT_PROMPT_TEMPLATE, topic).unwrap_or_default()
}
