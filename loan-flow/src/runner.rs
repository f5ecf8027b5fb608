//! FlowRunner – loads a session, executes exactly **one** conversation turn, and persists the
//! updated session back to storage.
//!
//! Web handlers should go through the runner so that every reply is matched by a saved session.
//! Use [`Graph::execute_session`] directly when replaying a transcript or when you want to
//! inspect the next session before deciding whether to keep it.

use std::{path::PathBuf, sync::Arc};

use crate::{
    error::{FlowError, Result},
    graph::{ExecutionResult, Graph},
    storage::{Session, SessionStorage},
    task::{Input, Reply},
};

pub const GREETING: &str =
    "Hello! I'm your Loan Assistant. Type 'Apply loan' to begin or 'Check eligibility'.";

/// High-level helper that orchestrates the common _load → execute → save_ pattern.
#[derive(Clone)]
pub struct FlowRunner {
    graph: Arc<Graph>,
    storage: Arc<dyn SessionStorage>,
}

impl FlowRunner {
    pub fn new(graph: Arc<Graph>, storage: Arc<dyn SessionStorage>) -> Self {
        Self { graph, storage }
    }

    /// Create (or restart) a session for `customer_id` and return the greeting.
    ///
    /// An existing session of the same customer is reset to idle with its
    /// fields and pending sanction letter dropped.
    pub async fn start_chat(&self, session_id: &str, customer_id: &str) -> Result<Reply> {
        let session = match self.storage.get(session_id).await? {
            Some(mut session) if session.customer_id() == customer_id => {
                session.reset();
                session
            }
            _ => Session::new(session_id, customer_id),
        };
        self.storage.save(session).await?;
        Ok(Reply::info(GREETING))
    }

    /// Execute **exactly one** turn for the given `session_id` and persist the updated session.
    pub async fn run(&self, session_id: &str, input: Input) -> Result<ExecutionResult> {
        let session = self.load(session_id).await?;

        let result = self.graph.execute_session(&session, input).await?;

        self.storage.save(result.session.clone()).await?;

        Ok(result)
    }

    /// Hand out the pending sanction letter path once; later calls return `None`.
    pub async fn take_sanction(&self, session_id: &str) -> Result<Option<PathBuf>> {
        let mut session = self.load(session_id).await?;
        let path = session.take_sanction();
        if path.is_some() {
            self.storage.save(session).await?;
        }
        Ok(path)
    }

    async fn load(&self, session_id: &str) -> Result<Session> {
        self.storage
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))
    }
}
