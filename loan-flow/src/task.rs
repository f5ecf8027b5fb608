use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{context::Context, error::Result, stage::Stage};

/// One unit of user input fed into the flow.
#[derive(Debug, Clone)]
pub enum Input {
    /// Free text typed by the user
    Text(String),
    /// A document submitted through the upload entry point
    Upload(Upload),
}

impl Input {
    pub fn text(text: impl Into<String>) -> Self {
        Input::Text(text.into())
    }

    pub fn upload(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Input::Upload(Upload {
            file_name: file_name.into(),
            bytes,
        })
    }

    /// Trimmed text of a text input; empty for uploads.
    pub fn as_text(&self) -> &str {
        match self {
            Input::Text(text) => text.trim(),
            Input::Upload(_) => "",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// What kind of reply the flow produced. Callers branch on this, never on the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    /// Next question in the sequence
    Prompt,
    /// Input failed validation; the stage did not change
    Invalid,
    /// Informational answer (offers, quick quote, help, reminders)
    Info,
    /// A salary slip must be submitted through the upload entry point
    UploadRequired,
    /// Eligible; waiting for a yes/no confirmation
    ConfirmationRequired,
    /// Eligible pending manual verification of the uploaded salary slip
    ManualVerification,
    Rejected,
    Cancelled,
    Sanctioned,
    NotUnderstood,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub kind: ReplyKind,
}

impl Reply {
    pub fn new(kind: ReplyKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(ReplyKind::Prompt, text)
    }

    pub fn invalid(text: impl Into<String>) -> Self {
        Self::new(ReplyKind::Invalid, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(ReplyKind::Info, text)
    }

    pub fn needs_upload(&self) -> bool {
        self.kind == ReplyKind::UploadRequired
    }
}

/// Result of a task execution
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Reply to send to the user
    pub reply: Reply,
    /// Next action to take
    pub next_action: NextAction,
    /// Short description of the turn, kept on the session for diagnostics
    pub status_message: Option<String>,
    /// Sanction letter produced by this turn, if any
    pub artifact: Option<PathBuf>,
}

impl TaskResult {
    pub fn new(reply: Reply, next_action: NextAction) -> Self {
        Self {
            reply,
            next_action,
            status_message: None,
            artifact: None,
        }
    }

    pub fn new_with_status(
        reply: Reply,
        next_action: NextAction,
        status_message: impl Into<String>,
    ) -> Self {
        Self {
            reply,
            next_action,
            status_message: Some(status_message.into()),
            artifact: None,
        }
    }

    /// Validation failure: reply and stay put.
    pub fn retry(message: impl Into<String>) -> Self {
        Self::new(Reply::invalid(message), NextAction::WaitForInput)
    }

    pub fn with_artifact(mut self, path: PathBuf) -> Self {
        self.artifact = Some(path);
        self
    }
}

/// Defines what should happen after a task completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    /// Move along the outgoing edge of the current stage
    Continue,
    /// Jump to a specific stage
    GoTo(Stage),
    /// Stay on the current stage
    WaitForInput,
    /// Terminal outcome: back to idle with the captured fields cleared
    End,
}

/// Core trait that every stage handler implements
#[async_trait]
pub trait Task: Send + Sync {
    /// Stage this task handles
    fn stage(&self) -> Stage;

    /// Handle one input for this stage, recording captured fields in `context`
    async fn run(&self, context: &mut Context, input: &Input) -> Result<TaskResult>;
}
