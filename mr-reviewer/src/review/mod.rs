//! Review units: what gets sent to the model and where the answer goes.

pub mod llm;
pub mod policy;
pub mod prompt;

use git_context_engine::Change;

use crate::config::Granularity;
use prompt::{ReviewPrompt, build_file_prompt, build_merge_request_prompt};

/// One prompt and the change a positioned comment would anchor to.
#[derive(Debug, Clone)]
pub struct ReviewUnit {
    pub prompt: ReviewPrompt,
    /// The single change reviewed; `None` for a whole merge request.
    pub anchor: Option<Change>,
}

impl ReviewUnit {
    /// Path used in log lines.
    pub fn label(&self) -> &str {
        self.anchor
            .as_ref()
            .map(|c| c.new_path.as_str())
            .unwrap_or("<merge request>")
    }
}

/// Splits `changes` into review units according to `granularity`.
pub fn plan_units(changes: &[Change], granularity: Granularity) -> Vec<ReviewUnit> {
    match granularity {
        Granularity::PerFile => changes
            .iter()
            .map(|c| ReviewUnit {
                prompt: build_file_prompt(c),
                anchor: Some(c.clone()),
            })
            .collect(),
        Granularity::PerMergeRequest => vec![ReviewUnit {
            prompt: build_merge_request_prompt(changes),
            anchor: None,
        }],
    }
}
