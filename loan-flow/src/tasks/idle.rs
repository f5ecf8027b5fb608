use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::{
    Context, Input, NextAction, Reply, Result, Stage, Task, TaskResult,
    customer::CustomerStore, eligibility::Quote,
};

pub const OFFERS: &str =
    "Offers: Personal Loan @11% p.a. / Women special -0.5% / Fee discount above 300k";
const HELP: &str = "Type 'Apply loan' to start or 'Check eligibility'.";
const NO_PROFILE: &str = "No profile found. Signup first.";

const OFFER_KEYWORDS: [&str; 2] = ["offer", "discount"];
const APPLY_KEYWORDS: [&str; 3] = ["apply", "loan", "start"];

/// Entry point of the flow. Also answers the offers and quick eligibility
/// questions without leaving idle.
pub struct IdleTask {
    customers: Arc<dyn CustomerStore>,
}

impl IdleTask {
    pub fn new(customers: Arc<dyn CustomerStore>) -> Self {
        Self { customers }
    }

    async fn quick_eligibility(&self, customer_id: &str) -> Result<Reply> {
        let reply = match self.customers.lookup(customer_id).await? {
            Some(customer) => Reply::info(Quote::for_customer(&customer).to_string()),
            None => Reply::info(NO_PROFILE),
        };
        Ok(reply)
    }
}

#[async_trait]
impl Task for IdleTask {
    fn stage(&self) -> Stage {
        Stage::Idle
    }

    async fn run(&self, context: &mut Context, input: &Input) -> Result<TaskResult> {
        let text = input.as_text().to_lowercase();

        if OFFER_KEYWORDS.iter().any(|k| text.contains(k)) {
            return Ok(TaskResult::new(Reply::info(OFFERS), NextAction::WaitForInput));
        }

        if text.contains("eligib") {
            let reply = self.quick_eligibility(context.customer_id()).await?;
            return Ok(TaskResult::new(reply, NextAction::WaitForInput));
        }

        if APPLY_KEYWORDS.iter().any(|k| text.contains(k)) {
            info!(customer_id = %context.customer_id(), "Starting loan application");
            return Ok(TaskResult::new_with_status(
                Reply::prompt("Sure — what loan amount do you need?"),
                NextAction::Continue,
                "Application started",
            ));
        }

        Ok(TaskResult::new(Reply::info(HELP), NextAction::WaitForInput))
    }
}
