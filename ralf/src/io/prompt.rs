//! Guidance templates fed to agent CLIs and written by `ralf init`.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use super::init::{AGENTS_FILE, JOURNAL_FILE, TASK_SPEC_FILE};
use crate::core::completion::COMPLETION_MARKER;
use crate::core::types::ToolVariant;

const CLAUDE_TEMPLATE: &str = include_str!("templates/claude.md");
const AMP_TEMPLATE: &str = include_str!("templates/amp.md");
const AGENTS_TEMPLATE: &str = include_str!("templates/agents.md");

/// Template engine wrapper around minijinja.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("claude", CLAUDE_TEMPLATE)
            .context("load claude template")?;
        env.add_template("amp", AMP_TEMPLATE)
            .context("load amp template")?;
        env.add_template("agents", AGENTS_TEMPLATE)
            .context("load agents template")?;
        Ok(Self { env })
    }

    /// Render the guidance file piped to `variant` on every iteration.
    pub fn render_guidance(&self, variant: ToolVariant) -> Result<String> {
        self.render(variant.name())
    }

    /// Render the initial `AGENTS.md`.
    pub fn render_agents(&self) -> Result<String> {
        self.render("agents")
    }

    fn render(&self, name: &str) -> Result<String> {
        let template = self.env.get_template(name)?;
        let rendered = template
            .render(context! {
                task_spec_file => TASK_SPEC_FILE,
                journal_file => JOURNAL_FILE,
                agents_file => AGENTS_FILE,
                marker => COMPLETION_MARKER,
            })
            .with_context(|| format!("render {name} template"))?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::completion::contains_completion;

    #[test]
    fn guidance_mentions_marker_and_files() {
        let engine = TemplateEngine::new().expect("engine");
        for variant in ToolVariant::ALL {
            let text = engine.render_guidance(variant).expect("render");
            assert!(contains_completion(&text), "{variant} guidance lacks marker");
            assert!(text.contains(TASK_SPEC_FILE));
            assert!(text.contains(JOURNAL_FILE));
            assert!(!text.contains("{{"));
        }
    }

    #[test]
    fn variants_render_distinct_guidance() {
        let engine = TemplateEngine::new().expect("engine");
        let claude = engine.render_guidance(ToolVariant::Claude).expect("claude");
        let amp = engine.render_guidance(ToolVariant::Amp).expect("amp");
        assert_ne!(claude, amp);
    }

    #[test]
    fn agents_notes_reference_task_spec() {
        let engine = TemplateEngine::new().expect("engine");
        let text = engine.render_agents().expect("render");
        assert!(text.starts_with("# Agent Notes"));
        assert!(text.contains(TASK_SPEC_FILE));
    }
}
