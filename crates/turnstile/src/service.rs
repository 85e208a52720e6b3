//! Transport-agnostic ticketing service.
//!
//! Owns the active configuration, the activity log, the current pool and
//! session, and the shutdown signal. Transports (HTTP today) delegate to
//! this service for the four core operations: start a session, stop a
//! session, query the pool, reset.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::activity::{ActivityEvent, ActivityLog, EventCategory};
use crate::config::{ConfigError, SimulationConfig};
use crate::pool::{PoolSnapshot, TicketPool};
use crate::session::Session;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a session is already running")]
    AlreadyRunning,
    #[error("no session is running")]
    NotRunning,
    #[error("operation not allowed while a session is running")]
    SessionRunning,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateConfigError {
    #[error(transparent)]
    Invalid(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Session lifecycle state for status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// No session has run yet.
    Idle,
    Running,
    /// A session ran and was stopped; its pool remains inspectable.
    Stopped,
}

/// Snapshot of service state for transports to render.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolSnapshot>,
}

struct Runtime {
    pool: Option<Arc<TicketPool>>,
    session: Option<Session>,
    state: SessionState,
    last_session_id: Option<Uuid>,
}

pub struct TicketingService {
    config: RwLock<SimulationConfig>,
    runtime: RwLock<Runtime>,
    activity: ActivityLog,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TicketingService {
    pub fn new(config: SimulationConfig, activity: ActivityLog) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config: RwLock::new(config),
            runtime: RwLock::new(Runtime {
                pool: None,
                session: None,
                state: SessionState::Idle,
                last_session_id: None,
            }),
            activity,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub async fn config(&self) -> SimulationConfig {
        self.config.read().await.clone()
    }

    /// Replace the active configuration. Refused while a session runs;
    /// the new values apply to the next started session.
    pub async fn update_config(&self, config: SimulationConfig) -> Result<(), UpdateConfigError> {
        config.validate()?;
        if self.runtime.read().await.session.is_some() {
            return Err(SessionError::SessionRunning.into());
        }
        *self.config.write().await = config;
        self.activity
            .record(EventCategory::System, None, "Configuration updated");
        Ok(())
    }

    /// Construct a fresh pool from the active configuration and spawn
    /// the worker set against it. The previous pool, if any, is
    /// discarded.
    pub async fn start_session(&self) -> Result<Uuid, SessionError> {
        let config = self.config.read().await.clone();
        let mut runtime = self.runtime.write().await;
        if runtime.session.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        let pool = Arc::new(TicketPool::new(
            config.max_ticket_capacity as usize,
            u64::from(config.total_tickets),
            self.activity.clone(),
        ));
        let session = Session::start(&config, Arc::clone(&pool), self.activity.clone());
        let id = session.id();

        runtime.pool = Some(pool);
        runtime.session = Some(session);
        runtime.state = SessionState::Running;
        runtime.last_session_id = Some(id);
        Ok(id)
    }

    /// Cancel every worker and wait for them to exit. The pool is left
    /// in place so its final counters stay inspectable.
    pub async fn stop_session(&self) -> Result<(), SessionError> {
        let session = {
            let mut runtime = self.runtime.write().await;
            runtime.session.take().ok_or(SessionError::NotRunning)?
        };
        // Join outside the lock so status queries are not held up by
        // worker shutdown.
        session.stop().await;

        let mut runtime = self.runtime.write().await;
        if runtime.session.is_none() {
            runtime.state = SessionState::Stopped;
        }
        Ok(())
    }

    /// Reset the current pool between sessions. Refused while a session
    /// is running.
    pub async fn reset(&self) -> Result<(), SessionError> {
        let runtime = self.runtime.read().await;
        if runtime.session.is_some() {
            return Err(SessionError::SessionRunning);
        }
        match &runtime.pool {
            Some(pool) => pool.reset(),
            // Nothing to clear yet; keep the audit trail consistent.
            None => self
                .activity
                .record(EventCategory::System, None, "System has been reset"),
        }
        Ok(())
    }

    /// Current available count. Advisory only.
    pub async fn available(&self) -> usize {
        match &self.runtime.read().await.pool {
            Some(pool) => pool.len(),
            None => 0,
        }
    }

    pub async fn status(&self) -> StatusSnapshot {
        let runtime = self.runtime.read().await;
        StatusSnapshot {
            state: runtime.state,
            session_id: runtime.last_session_id,
            pool: runtime.pool.as_ref().map(|pool| pool.snapshot()),
        }
    }

    pub async fn recent_logs(&self, category: Option<EventCategory>) -> Vec<ActivityEvent> {
        match category {
            Some(category) => self.activity.recent_by_category(category),
            None => self.activity.recent(),
        }
    }

    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }
}
