//! Append-only activity sink shared by the pool, the workers and the
//! session lifecycle.
//!
//! `record` never blocks and never fails the caller: events land in a
//! bounded in-memory ring for the audit surface and on a channel drained
//! by a line-oriented file writer task. A closed channel or a failed file
//! write is a collaborator failure and must never abort a ticketing
//! operation; failed writes are not retried.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// Most recent events retained for display.
const RECENT_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCategory {
    Vendor,
    Customer,
    System,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vendor => "VENDOR",
            Self::Customer => "CUSTOMER",
            Self::System => "SYSTEM",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    pub category: EventCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<u32>,
    pub message: String,
}

impl ActivityEvent {
    fn line(&self) -> String {
        format!(
            "[{}] [{}] {}\n",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.category.as_str(),
            self.message
        )
    }
}

/// Clone-able handle to the activity sink.
#[derive(Clone)]
pub struct ActivityLog {
    tx: Option<mpsc::UnboundedSender<ActivityEvent>>,
    recent: Arc<Mutex<VecDeque<ActivityEvent>>>,
}

impl ActivityLog {
    /// In-memory sink only, no file writer. Used by tests and embedders.
    pub fn in_memory() -> Self {
        Self {
            tx: None,
            recent: Arc::new(Mutex::new(VecDeque::with_capacity(RECENT_CAPACITY))),
        }
    }

    /// Sink that also appends one line per event to `path`.
    ///
    /// Spawns the writer task, so this must be called from within a tokio
    /// runtime. The handle never waits on the writer.
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_lines(path.into(), rx));
        Self {
            tx: Some(tx),
            recent: Arc::new(Mutex::new(VecDeque::with_capacity(RECENT_CAPACITY))),
        }
    }

    pub fn record(
        &self,
        category: EventCategory,
        actor: Option<u32>,
        message: impl Into<String>,
    ) {
        let event = ActivityEvent {
            timestamp: Utc::now(),
            category,
            actor,
            message: message.into(),
        };

        tracing::info!(
            target: "activity",
            category = event.category.as_str(),
            actor = event.actor,
            "{}",
            event.message
        );

        {
            let mut recent = match self.recent.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if recent.len() == RECENT_CAPACITY {
                recent.pop_front();
            }
            recent.push_back(event.clone());
        }

        if let Some(tx) = &self.tx {
            // A closed writer is the collaborator's failure, not ours.
            let _ = tx.send(event);
        }
    }

    /// Recent events, newest first.
    pub fn recent(&self) -> Vec<ActivityEvent> {
        let recent = match self.recent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        recent.iter().rev().cloned().collect()
    }

    /// Recent events of one category, newest first.
    pub fn recent_by_category(&self, category: EventCategory) -> Vec<ActivityEvent> {
        self.recent()
            .into_iter()
            .filter(|event| event.category == category)
            .collect()
    }
}

async fn write_lines(path: PathBuf, mut rx: mpsc::UnboundedReceiver<ActivityEvent>) {
    let mut file = match tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "activity log file unavailable, dropping events"
            );
            // Keep draining so senders never observe a closed channel.
            while rx.recv().await.is_some() {}
            return;
        }
    };

    while let Some(event) = rx.recv().await {
        if let Err(e) = file.write_all(event.line().as_bytes()).await {
            tracing::warn!(error = %e, "failed to append activity log line");
        }
    }
}
