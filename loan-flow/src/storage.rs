use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};

use crate::{context::Context, error::Result, stage::Stage};

/// Conversation state for one applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub stage: Stage,
    pub context: Context,
    /// Path of the latest sanction letter, consumed once by [`Session::take_sanction`]
    pub last_sanction_path: Option<PathBuf>,
    pub status_message: Option<String>,
}

impl Session {
    pub fn new(id: impl Into<String>, customer_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stage: Stage::Idle,
            context: Context::new(customer_id),
            last_sanction_path: None,
            status_message: None,
        }
    }

    pub fn customer_id(&self) -> &str {
        self.context.customer_id()
    }

    /// Hand out the sanction letter path and forget it.
    pub fn take_sanction(&mut self) -> Option<PathBuf> {
        self.last_sanction_path.take()
    }

    /// Drop everything captured so far and return to idle.
    pub fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.context.clear();
        self.last_sanction_path = None;
        self.status_message = None;
    }
}

/// Trait for storing and retrieving sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Session) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Session>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory implementation of SessionStorage
#[derive(Default)]
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
