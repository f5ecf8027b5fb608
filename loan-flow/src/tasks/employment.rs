use async_trait::async_trait;

use crate::{
    Context, Input, NextAction, Reply, Result, Stage, Task, TaskResult, parse::parse_employment,
};

use super::session_keys;

pub struct EmploymentTask;

#[async_trait]
impl Task for EmploymentTask {
    fn stage(&self) -> Stage {
        Stage::AskEmployment
    }

    async fn run(&self, context: &mut Context, input: &Input) -> Result<TaskResult> {
        let Some(employment) = parse_employment(input.as_text()) else {
            return Ok(TaskResult::retry("Please reply 'Salaried' or 'Self-Employed'."));
        };

        context.set(session_keys::EMPLOYMENT_TYPE, employment)?;

        Ok(TaskResult::new(
            Reply::prompt("Existing EMI (0 if none)?"),
            NextAction::Continue,
        ))
    }
}
