use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    Context, Input, Result, Stage, Task, TaskResult,
    eligibility::{LoanApplication, Rejection},
    parse::parse_number,
};

use super::{
    session_keys,
    underwriting::{Underwriter, reject},
};

/// Last question. Runs the final eligibility check, which decides between
/// the salary slip upload, the confirmation step and a rejection.
pub struct ExistingEmiTask {
    underwriter: Arc<Underwriter>,
}

impl ExistingEmiTask {
    pub fn new(underwriter: Arc<Underwriter>) -> Self {
        Self { underwriter }
    }
}

#[async_trait]
impl Task for ExistingEmiTask {
    fn stage(&self) -> Stage {
        Stage::AskExistingEmi
    }

    async fn run(&self, context: &mut Context, input: &Input) -> Result<TaskResult> {
        let Some(existing_emi) = parse_number(input.as_text()).filter(|e| *e >= 0.0) else {
            return Ok(TaskResult::retry("Enter existing EMI as a number (0 if none)."));
        };
        context.set(session_keys::EXISTING_EMI, existing_emi)?;

        let application = LoanApplication::from_context(context)?;
        let Some(profile) = self
            .underwriter
            .registered_profile(context, &application)
            .await?
        else {
            return Ok(reject(context, Rejection::ProfileMissing));
        };

        let decision = self.underwriter.policy().assess(&application, &profile);
        self.underwriter.conclude(context, &application, decision)
    }
}
