//! Conversational loan application flow.
//!
//! A [`Graph`] holds one [`Task`] per [`Stage`]. Each turn takes a
//! [`Session`] and one [`Input`] and produces the next session plus a
//! structured [`Reply`]; [`FlowRunner`] wraps that in load/execute/save.
//! [`workflow::build_loan_workflow`] wires the loan application stages.

pub mod context;
pub mod customer;
pub mod eligibility;
pub mod error;
pub mod graph;
pub mod parse;
pub mod reconcile;
pub mod runner;
pub mod sanction;
pub mod stage;
pub mod storage;
pub mod task;
pub mod tasks;
pub mod workflow;

// Re-export commonly used types
pub use context::Context;
pub use customer::{CsvCustomerStore, Customer, CustomerStore, InMemoryCustomerStore, NewCustomer};
pub use eligibility::{EligibilityPolicy, MissingProfilePolicy};
pub use error::{FlowError, Result};
pub use graph::{ExecutionResult, ExecutionStatus, Graph, GraphBuilder};
pub use runner::{FlowRunner, GREETING};
pub use sanction::{PdfSanctionWriter, SanctionGenerator};
pub use stage::Stage;
pub use storage::{InMemorySessionStorage, Session, SessionStorage};
pub use task::{Input, NextAction, Reply, ReplyKind, Task, TaskResult, Upload};
pub use workflow::{build_loan_workflow, create_flow_runner};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Echoes the input into the context and follows whatever action it was built with.
    struct EchoTask {
        stage: Stage,
        action: NextAction,
    }

    #[async_trait]
    impl Task for EchoTask {
        fn stage(&self) -> Stage {
            self.stage
        }

        async fn run(&self, context: &mut Context, input: &Input) -> Result<TaskResult> {
            context.set("echo", input.as_text())?;
            Ok(TaskResult::new(
                Reply::prompt(format!("Processed: {}", input.as_text())),
                self.action.clone(),
            ))
        }
    }

    fn echo(stage: Stage, action: NextAction) -> Arc<dyn Task> {
        Arc::new(EchoTask { stage, action })
    }

    #[tokio::test]
    async fn test_continue_follows_edge() {
        let graph = GraphBuilder::new("test_graph")
            .add_task(echo(Stage::Idle, NextAction::Continue))
            .add_task(echo(Stage::AskAmount, NextAction::WaitForInput))
            .add_edge(Stage::Idle, Stage::AskAmount)
            .build();

        let session = Session::new("s1", "c1");
        let result = graph
            .execute_session(&session, Input::text("Hello, World!"))
            .await
            .unwrap();

        assert_eq!(result.reply.text, "Processed: Hello, World!");
        assert_eq!(result.session.stage, Stage::AskAmount);
        assert_eq!(result.status, ExecutionStatus::WaitingForInput);
        assert_eq!(
            result.session.context.get::<String>("echo").as_deref(),
            Some("Hello, World!")
        );
    }

    #[tokio::test]
    async fn test_conditional_edges_in_order() {
        let graph = GraphBuilder::new("conditional")
            .add_task(echo(Stage::AskExistingEmi, NextAction::Continue))
            .add_conditional_edge(Stage::AskExistingEmi, Stage::AwaitSalaryUpload, |ctx| {
                ctx.get::<String>("echo").as_deref() == Some("upload")
            })
            .add_edge(Stage::AskExistingEmi, Stage::Confirm)
            .build();

        let mut session = Session::new("s1", "c1");
        session.stage = Stage::AskExistingEmi;

        let result = graph
            .execute_session(&session, Input::text("upload"))
            .await
            .unwrap();
        assert_eq!(result.session.stage, Stage::AwaitSalaryUpload);

        let result = graph
            .execute_session(&session, Input::text("0"))
            .await
            .unwrap();
        assert_eq!(result.session.stage, Stage::Confirm);
    }

    #[tokio::test]
    async fn test_end_clears_context() {
        let graph = GraphBuilder::new("end")
            .add_task(echo(Stage::Confirm, NextAction::End))
            .build();

        let mut session = Session::new("s1", "c1");
        session.stage = Stage::Confirm;
        session.context.set("loan_amount", 1000.0).unwrap();

        let result = graph
            .execute_session(&session, Input::text("no"))
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(result.session.stage, Stage::Idle);
        assert!(result.session.context.is_empty());
        assert_eq!(result.session.customer_id(), "c1");
    }

    #[tokio::test]
    async fn test_goto_unknown_stage_fails() {
        let graph = GraphBuilder::new("goto")
            .add_task(echo(Stage::Idle, NextAction::GoTo(Stage::Confirm)))
            .build();

        let err = graph
            .execute_session(&Session::new("s1", "c1"), Input::text("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::StageNotFound(Stage::Confirm)));
    }

    #[tokio::test]
    async fn test_unhandled_stage_and_stray_upload() {
        let graph = GraphBuilder::new("empty").build();
        let session = Session::new("s1", "c1");

        let result = graph
            .execute_session(&session, Input::text("hi"))
            .await
            .unwrap();
        assert_eq!(result.reply.kind, ReplyKind::NotUnderstood);
        assert_eq!(result.session, session);

        let result = graph
            .execute_session(&session, Input::upload("slip.pdf", Vec::new()))
            .await
            .unwrap();
        assert_eq!(result.reply.kind, ReplyKind::Invalid);
        assert_eq!(result.session, session);
    }

    #[tokio::test]
    async fn test_storage() {
        let storage = InMemorySessionStorage::new();
        let mut session = Session::new("session1", "c1");
        session.stage = Stage::AskTenure;

        storage.save(session.clone()).await.unwrap();
        assert_eq!(storage.get("session1").await.unwrap(), Some(session));

        storage.delete("session1").await.unwrap();
        assert!(storage.get("session1").await.unwrap().is_none());
    }
}
