//! Background rebuild submission with observable completion.
//!
//! Each [`RebuildQueue::submit`] spawns one [`IndexBuilder::run`] on the
//! current tokio runtime and hands back a [`RebuildTicket`]. Callers may
//! drop the ticket (fire-and-forget) or await it. Concurrent runs compete
//! for the cross-process lock; a loser that times out finishes with
//! [`RebuildOutcome::LockTimedOut`] and is not retried.

use crate::builder::IndexBuilder;
use crate::types::RebuildOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Lifecycle of one submitted rebuild.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RebuildStatus {
    Pending,
    Running,
    Finished { outcome: RebuildOutcome },
    Failed { error: String },
}

impl RebuildStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Failed { .. })
    }
}

/// Handle on a submitted rebuild.
#[derive(Debug, Clone)]
pub struct RebuildTicket {
    pub id: Uuid,
    pub submitted_at: DateTime<Utc>,
    status: watch::Receiver<RebuildStatus>,
}

impl RebuildTicket {
    /// Current status without waiting.
    pub fn status(&self) -> RebuildStatus {
        self.status.borrow().clone()
    }

    /// Wait until the run finishes or fails.
    pub async fn wait(&self) -> RebuildStatus {
        let mut rx = self.status.clone();
        let status = match rx.wait_for(RebuildStatus::is_terminal).await {
            Ok(status) => status.clone(),
            Err(_) => RebuildStatus::Failed {
                error: "rebuild task ended without reporting".to_string(),
            },
        };
        status
    }
}

/// Spawns rebuild runs and tracks the outstanding ones.
#[derive(Debug)]
pub struct RebuildQueue {
    builder: Arc<IndexBuilder>,
    outstanding: Mutex<Vec<JoinHandle<()>>>,
}

impl RebuildQueue {
    pub fn new(builder: IndexBuilder) -> Self {
        Self {
            builder: Arc::new(builder),
            outstanding: Mutex::new(Vec::new()),
        }
    }

    /// Start a rebuild in the background. Must be called inside a tokio runtime.
    pub fn submit(&self) -> RebuildTicket {
        let id = Uuid::new_v4();
        let submitted_at = Utc::now();
        let (tx, rx) = watch::channel(RebuildStatus::Pending);
        let builder = Arc::clone(&self.builder);

        let handle = tokio::spawn(async move {
            tx.send_replace(RebuildStatus::Running);
            tracing::debug!(rebuild = %id, "Rebuild started");

            let status = match builder.run().await {
                Ok(outcome) => {
                    tracing::info!(rebuild = %id, "{}", outcome.summary());
                    RebuildStatus::Finished { outcome }
                }
                Err(e) => {
                    tracing::error!(rebuild = %id, error = %e, "Rebuild failed");
                    RebuildStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            tx.send_replace(status);
        });

        match self.outstanding.lock() {
            Ok(mut outstanding) => {
                outstanding.retain(|h| !h.is_finished());
                outstanding.push(handle);
            }
            Err(_) => tracing::warn!("Rebuild queue bookkeeping poisoned; run not tracked"),
        }

        tracing::info!(rebuild = %id, "Rebuild submitted");
        RebuildTicket {
            id,
            submitted_at,
            status: rx,
        }
    }

    /// Await every run submitted so far. Returns how many were awaited.
    pub async fn drain(&self) -> usize {
        let handles: Vec<JoinHandle<()>> = match self.outstanding.lock() {
            Ok(mut outstanding) => outstanding.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        let count = handles.len();

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::error!("Rebuild task aborted: {}", e);
            }
        }

        count
    }
}
