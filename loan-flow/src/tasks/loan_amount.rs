use async_trait::async_trait;
use tracing::debug;

use crate::{
    Context, Input, NextAction, Reply, Result, Stage, Task, TaskResult, parse::parse_number,
};

use super::session_keys;

pub struct LoanAmountTask;

#[async_trait]
impl Task for LoanAmountTask {
    fn stage(&self) -> Stage {
        Stage::AskAmount
    }

    async fn run(&self, context: &mut Context, input: &Input) -> Result<TaskResult> {
        let Some(amount) = parse_number(input.as_text()).filter(|a| *a > 0.0) else {
            return Ok(TaskResult::retry("Please enter a valid numeric loan amount."));
        };

        debug!(loan_amount = amount, "Loan amount captured");
        context.set(session_keys::LOAN_AMOUNT, amount)?;

        Ok(TaskResult::new(
            Reply::prompt("Enter tenure in months (6–84)."),
            NextAction::Continue,
        ))
    }
}
