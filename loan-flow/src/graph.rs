use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info, warn};

use crate::{
    context::Context,
    error::{FlowError, Result},
    stage::Stage,
    storage::Session,
    task::{Input, NextAction, Reply, ReplyKind, Task},
};

/// Type alias for edge condition functions
pub type EdgeCondition = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Edge between stages in the graph
#[derive(Clone)]
pub struct Edge {
    pub from: Stage,
    pub to: Stage,
    pub condition: Option<EdgeCondition>,
}

const NOT_UNDERSTOOD: &str = "I didn't understand. Please follow the prompts.";
const UPLOAD_NOT_EXPECTED: &str = "No document is needed right now. Please follow the prompts.";

/// The conversation graph: one task per stage plus the edges between stages.
pub struct Graph {
    pub id: String,
    tasks: HashMap<Stage, Arc<dyn Task>>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: HashMap::new(),
            edges: Vec::new(),
        }
    }

    /// Run one turn against `session` and return the resulting session.
    ///
    /// The caller's session is left untouched; persisting the returned one is
    /// what makes the turn take effect.
    pub async fn execute_session(
        &self,
        session: &Session,
        input: Input,
    ) -> Result<ExecutionResult> {
        let mut next = session.clone();
        let stage = session.stage;

        if matches!(input, Input::Upload(_)) && stage != Stage::AwaitSalaryUpload {
            warn!(
                session_id = %session.id,
                stage = %stage,
                "Upload received outside of salary upload stage"
            );
            return Ok(ExecutionResult::waiting(
                next,
                Reply::invalid(UPLOAD_NOT_EXPECTED),
            ));
        }

        let Some(task) = self.tasks.get(&stage) else {
            debug!(session_id = %session.id, stage = %stage, "No task for stage");
            return Ok(ExecutionResult::waiting(
                next,
                Reply::new(ReplyKind::NotUnderstood, NOT_UNDERSTOOD),
            ));
        };

        let result = task.run(&mut next.context, &input).await?;
        next.status_message = result.status_message.clone();

        let status = match &result.next_action {
            NextAction::Continue => {
                match self.find_next_stage(stage, &next.context) {
                    Some(to) => next.stage = to,
                    None => warn!(
                        session_id = %session.id,
                        stage = %stage,
                        "No outgoing edge, staying"
                    ),
                }
                ExecutionStatus::WaitingForInput
            }
            NextAction::GoTo(target) => {
                if !self.tasks.contains_key(target) {
                    return Err(FlowError::StageNotFound(*target));
                }
                next.stage = *target;
                ExecutionStatus::WaitingForInput
            }
            NextAction::WaitForInput => ExecutionStatus::WaitingForInput,
            NextAction::End => {
                next.stage = Stage::Idle;
                next.context.clear();
                ExecutionStatus::Completed
            }
        };

        if let Some(path) = result.artifact {
            next.last_sanction_path = Some(path);
        }

        info!(
            session_id = %session.id,
            from = %stage,
            to = %next.stage,
            reply_kind = ?result.reply.kind,
            "Turn processed"
        );

        Ok(ExecutionResult {
            session: next,
            reply: result.reply,
            status,
        })
    }

    /// Find the next stage based on edges and conditions
    pub fn find_next_stage(&self, current: Stage, context: &Context) -> Option<Stage> {
        self.edges
            .iter()
            .filter(|edge| edge.from == current)
            .find(|edge| edge.condition.as_ref().is_none_or(|condition| condition(context)))
            .map(|edge| edge.to)
    }
}

/// Builder for creating graphs
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            graph: Graph::new(id),
        }
    }

    pub fn add_task(mut self, task: Arc<dyn Task>) -> Self {
        self.graph.tasks.insert(task.stage(), task);
        self
    }

    pub fn add_edge(mut self, from: Stage, to: Stage) -> Self {
        self.graph.edges.push(Edge {
            from,
            to,
            condition: None,
        });
        self
    }

    /// Conditional edges are tried in insertion order, so add them before the
    /// unconditional fallback edge of the same stage.
    pub fn add_conditional_edge<F>(mut self, from: Stage, to: Stage, condition: F) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.graph.edges.push(Edge {
            from,
            to,
            condition: Some(Arc::new(condition)),
        });
        self
    }

    pub fn build(self) -> Graph {
        self.graph
    }
}

/// Outcome of one turn
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub session: Session,
    pub reply: Reply,
    pub status: ExecutionStatus,
}

impl ExecutionResult {
    fn waiting(session: Session, reply: Reply) -> Self {
        Self {
            session,
            reply,
            status: ExecutionStatus::WaitingForInput,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Waiting for user input to continue
    WaitingForInput,
    /// The application attempt reached a terminal outcome
    Completed,
}
