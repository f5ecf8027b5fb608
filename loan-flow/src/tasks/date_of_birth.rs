use async_trait::async_trait;
use chrono::Local;

use crate::{
    Context, Input, NextAction, Reply, Result, Stage, Task, TaskResult,
    parse::{DobError, parse_dob},
};

use super::session_keys;

pub struct DateOfBirthTask;

#[async_trait]
impl Task for DateOfBirthTask {
    fn stage(&self) -> Stage {
        Stage::AskDob
    }

    async fn run(&self, context: &mut Context, input: &Input) -> Result<TaskResult> {
        let text = input.as_text();
        match parse_dob(text, Local::now().date_naive()) {
            Ok(_) => {}
            Err(DobError::Format) => {
                return Ok(TaskResult::retry("Invalid DOB format. Use DD-MM-YYYY."));
            }
            Err(DobError::OutOfRange) => return Ok(TaskResult::retry("DOB seems invalid.")),
        }

        // kept as typed; the letter prints it verbatim
        context.set(session_keys::DATE_OF_BIRTH, text)?;

        Ok(TaskResult::new(
            Reply::prompt("Enter PAN or Aadhaar number."),
            NextAction::Continue,
        ))
    }
}
