use crate::token_store::TokenStore;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Observable state of the refresh coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing { waiters: usize },
}

/// Result of asking the coordinator for a fresh token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(String),
    /// `leader` is true for the one caller that ran the failed refresh
    Failed { leader: bool },
}

impl RefreshOutcome {
    pub fn token(&self) -> Option<&str> {
        match self {
            RefreshOutcome::Refreshed(token) => Some(token),
            RefreshOutcome::Failed { .. } => None,
        }
    }
}

type Waiter = oneshot::Sender<Option<String>>;

enum Phase {
    Idle,
    /// One refresh is in flight; everyone else waits here in FIFO order
    Refreshing(VecDeque<Waiter>),
}

/// Single-flight guard around [`TokenStore::refresh_access_token`]
pub struct RefreshCoordinator {
    phase: Mutex<Phase>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(Phase::Idle),
        }
    }

    pub fn state(&self) -> RefreshState {
        match &*self.lock() {
            Phase::Idle => RefreshState::Idle,
            Phase::Refreshing(queue) => RefreshState::Refreshing {
                waiters: queue.len(),
            },
        }
    }

    /// Obtain a fresh access token after a 401.
    ///
    /// `stale_token` is the token the failed request carried. When the store already
    /// holds a different token another request has refreshed in the meantime and no
    /// new refresh is issued.
    pub async fn refresh(&self, tokens: &dyn TokenStore, stale_token: Option<&str>) -> RefreshOutcome {
        let waiter = {
            let mut phase = self.lock();
            match &mut *phase {
                Phase::Refreshing(queue) => {
                    let (tx, rx) = oneshot::channel();
                    queue.push_back(tx);
                    debug!("Refresh in flight, queued at position {}", queue.len());
                    Some(rx)
                }
                Phase::Idle => {
                    *phase = Phase::Refreshing(VecDeque::new());
                    None
                }
            }
        };

        if let Some(rx) = waiter {
            return match rx.await.ok().flatten() {
                Some(token) => RefreshOutcome::Refreshed(token),
                None => RefreshOutcome::Failed { leader: false },
            };
        }

        let guard = LeaderGuard { coordinator: self };

        let current = tokens.access_token().await;
        let result = if current.is_some() && current.as_deref() != stale_token {
            debug!("Access token already rotated, skipping refresh");
            current
        } else {
            info!("Refreshing access token");
            tokens.refresh_access_token().await
        };

        guard.finish(result.clone());
        match result {
            Some(token) => RefreshOutcome::Refreshed(token),
            None => RefreshOutcome::Failed { leader: true },
        }
    }

    fn complete(&self, result: Option<String>) {
        let queue = match std::mem::replace(&mut *self.lock(), Phase::Idle) {
            Phase::Refreshing(queue) => queue,
            Phase::Idle => VecDeque::new(),
        };

        if result.is_none() && !queue.is_empty() {
            warn!("Rejecting {} queued request(s) after failed refresh", queue.len());
        }
        for waiter in queue {
            // A waiter that gave up has nothing left to notify
            let _ = waiter.send(result.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases queued waiters even if the leading future is dropped mid-refresh
struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
}

impl LeaderGuard<'_> {
    fn finish(self, result: Option<String>) {
        self.coordinator.complete(result);
        std::mem::forget(self);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.complete(None);
    }
}
