//! Task spec (`prd.json`) loading.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Project, target branch and stories the agent works through.
///
/// Missing fields default to empty values; type mismatches are load errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskSpec {
    pub project: String,
    pub branch_name: String,
    pub description: String,
    #[serde(rename = "userStories")]
    pub stories: Vec<Story>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub title: String,
    pub description: String,
    pub acceptance_criteria: Vec<String>,
    pub priority: i64,
    pub passes: bool,
    pub notes: String,
}

impl TaskSpec {
    /// Number of stories already marked `passes`.
    pub fn passing_stories(&self) -> usize {
        self.stories.iter().filter(|story| story.passes).count()
    }

    /// Starter spec written by `ralf init`.
    pub fn template(project: &str, branch_name: &str) -> Self {
        Self {
            project: project.to_string(),
            branch_name: branch_name.to_string(),
            description: "Feature description".to_string(),
            stories: vec![Story {
                id: "US-001".to_string(),
                title: "First task".to_string(),
                description: "As a developer, I need to implement...".to_string(),
                acceptance_criteria: vec![
                    "Acceptance criterion 1".to_string(),
                    "Typecheck passes".to_string(),
                ],
                priority: 1,
                passes: false,
                notes: String::new(),
            }],
        }
    }
}

/// Load and parse the task spec at `path`.
pub fn load_task_spec(path: &Path) -> Result<TaskSpec> {
    debug!(path = %path.display(), "loading task spec");
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(anyhow!(
                "{} not found (run `ralf init` to create one)",
                path.display()
            ));
        }
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    let spec: TaskSpec = serde_json::from_str(&contents)
        .with_context(|| format!("invalid task spec {}", path.display()))?;
    debug!(project = %spec.project, branch = %spec.branch_name, stories = spec.stories.len(), "task spec loaded");
    Ok(spec)
}

/// Serialize `spec` to pretty-printed JSON with trailing newline.
pub fn render_task_spec(spec: &TaskSpec) -> Result<String> {
    let mut buf = serde_json::to_string_pretty(spec).context("serialize task spec")?;
    buf.push('\n');
    Ok(buf)
}
