use async_trait::async_trait;

use crate::{
    Context, Input, NextAction, Reply, Result, Stage, Task, TaskResult, parse::normalize_name,
};

use super::session_keys;

pub struct FullNameTask;

#[async_trait]
impl Task for FullNameTask {
    fn stage(&self) -> Stage {
        Stage::AskName
    }

    async fn run(&self, context: &mut Context, input: &Input) -> Result<TaskResult> {
        let Some(name) = normalize_name(input.as_text()) else {
            return Ok(TaskResult::retry("Name seems invalid — enter your Full Name."));
        };

        context.set(session_keys::FULL_NAME, name)?;

        Ok(TaskResult::new(
            Reply::prompt("Enter Date of Birth (DD-MM-YYYY)."),
            NextAction::Continue,
        ))
    }
}
