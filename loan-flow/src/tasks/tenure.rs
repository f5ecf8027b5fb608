use async_trait::async_trait;

use crate::{
    Context, Input, NextAction, Reply, Result, Stage, Task, TaskResult,
    parse::{parse_number, parse_tenure},
};

use super::session_keys;

pub struct TenureTask;

#[async_trait]
impl Task for TenureTask {
    fn stage(&self) -> Stage {
        Stage::AskTenure
    }

    async fn run(&self, context: &mut Context, input: &Input) -> Result<TaskResult> {
        let text = input.as_text();
        if parse_number(text).is_none() {
            return Ok(TaskResult::retry("Enter tenure as number (6–84)."));
        }
        let Some(months) = parse_tenure(text) else {
            return Ok(TaskResult::retry("Tenure must be between 6 and 84 months."));
        };

        context.set(session_keys::TENURE_MONTHS, months)?;

        Ok(TaskResult::new(
            Reply::prompt("Enter your Full Name (as per KYC)."),
            NextAction::Continue,
        ))
    }
}
