use async_trait::async_trait;

use crate::{
    Context, Input, NextAction, Reply, Result, Stage, Task, TaskResult,
    parse::is_valid_id_number,
};

use super::session_keys;

/// PAN or Aadhaar number. Only the length is checked.
pub struct IdNumberTask;

#[async_trait]
impl Task for IdNumberTask {
    fn stage(&self) -> Stage {
        Stage::AskId
    }

    async fn run(&self, context: &mut Context, input: &Input) -> Result<TaskResult> {
        let text = input.as_text();
        if !is_valid_id_number(text) {
            return Ok(TaskResult::retry("Enter valid PAN/Aadhaar (at least 6 chars)."));
        }

        context.set(session_keys::ID_NUMBER, text)?;

        Ok(TaskResult::new(
            Reply::prompt("Enter monthly income."),
            NextAction::Continue,
        ))
    }
}
