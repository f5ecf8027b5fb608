use async_trait::async_trait;

use crate::{
    Context, Input, NextAction, Reply, Result, Stage, Task, TaskResult, parse::parse_number,
};

use super::session_keys;

/// Self-declared monthly income, used for affordability. The registered
/// income on the customer record is what the large-loan gate compares against.
pub struct IncomeTask;

#[async_trait]
impl Task for IncomeTask {
    fn stage(&self) -> Stage {
        Stage::AskIncome
    }

    async fn run(&self, context: &mut Context, input: &Input) -> Result<TaskResult> {
        let Some(income) = parse_number(input.as_text()).filter(|i| *i > 0.0) else {
            return Ok(TaskResult::retry("Enter monthly income as a number."));
        };

        context.set(session_keys::INCOME, income)?;

        Ok(TaskResult::new(
            Reply::prompt("Employment Type? (Salaried / Self-Employed)"),
            NextAction::Continue,
        ))
    }
}
