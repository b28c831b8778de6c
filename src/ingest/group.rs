//! Bounded worker group with shared cancellation
//!
//! Workers are admitted through a counting semaphore. The first worker to fail
//! stores its error and cancels the group token; siblings observe the token
//! cooperatively and every worker is joined before [`TaskGroup::wait`] returns.

use crate::error::{AppError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

pub struct TaskGroup {
    cancel: CancellationToken,
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<()>,
    first_error: Arc<Mutex<Option<AppError>>>,
}

impl TaskGroup {
    /// Create a group whose token is a child of `parent`, running at most
    /// `limit` workers at once
    pub fn new(parent: &CancellationToken, limit: usize) -> Self {
        Self {
            cancel: parent.child_token(),
            semaphore: Arc::new(Semaphore::new(limit.max(1))),
            tasks: JoinSet::new(),
            first_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Token shared by every worker in the group
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for a free slot, then run `work` on the blocking pool.
    ///
    /// The slot is released when `work` returns, whatever the outcome.
    pub async fn spawn_blocking<F>(&mut self, work: F) -> Result<()>
    where
        F: FnOnce(CancellationToken) -> Result<()> + Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(format!("worker semaphore closed: {}", e)))?;

        let cancel = self.cancel.clone();
        let first_error = self.first_error.clone();

        self.tasks.spawn_blocking(move || {
            let _permit = permit;
            if let Err(e) = work(cancel.clone()) {
                record_failure(&first_error, &cancel, e);
            }
        });

        Ok(())
    }

    /// Join every worker and return the first recorded error, if any
    pub async fn wait(mut self) -> Result<()> {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                error!("ingestion worker aborted: {}", e);
                record_failure(
                    &self.first_error,
                    &self.cancel,
                    AppError::Internal(format!("worker aborted: {}", e)),
                );
            }
        }

        match self.first_error.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn record_failure(slot: &Mutex<Option<AppError>>, cancel: &CancellationToken, err: AppError) {
    let mut first = slot.lock();
    if first.is_none() {
        *first = Some(err);
        cancel.cancel();
    } else {
        warn!("additional worker failure after cancellation: {}", err);
    }
}
