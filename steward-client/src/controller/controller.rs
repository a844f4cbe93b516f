// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use steward_core::{Actor, Submission, SubmissionId, Timestamp, WorkflowError};
use steward_store::{Change, MemoryStore, StoreError, SubmissionStore};
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, trace, warn};

use crate::Config;
use crate::backend::{Backend, Mutation, Scope, Subscription, SubscriptionId};
use crate::controller::consumer::Consumer;

/// Serialises writes per submission and keeps the store in sync with the backend.
///
/// Every mutation runs a pure workflow function against the current record, applies the result
/// optimistically, persists it and either confirms or rolls it back. Two mutations on the same
/// submission never interleave, mutations on different submissions run concurrently.
pub struct Controller<B, S = MemoryStore>
where
    B: Backend,
    S: SubmissionStore,
{
    inner: Arc<Inner<B, S>>,
}

struct Inner<B, S>
where
    B: Backend,
    S: SubmissionStore,
{
    backend: B,
    store: S,
    config: Config,
    actor: OnceCell<Actor>,
    locks: Mutex<HashMap<SubmissionId, Arc<Mutex<()>>>>,
    subscriptions: RwLock<HashMap<SubscriptionId, B::Subscription>>,
}

impl<B, S> Clone for Controller<B, S>
where
    B: Backend,
    S: SubmissionStore,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B, S> Controller<B, S>
where
    B: Backend,
    S: SubmissionStore + Sync + 'static,
{
    pub fn new(backend: B, store: S, config: Config) -> Self {
        let inner = Inner {
            backend,
            store,
            config,
            actor: OnceCell::new(),
            locks: Mutex::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Actor all writes are attributed to, asked from the backend once.
    pub async fn current_actor(&self) -> Result<Actor, ControllerError<B>> {
        self.inner
            .actor
            .get_or_try_init(|| self.request(self.inner.backend.current_actor()))
            .await
            .cloned()
    }

    /// Replaces the local collection with the submissions visible in `scope`.
    pub async fn load(&self, scope: Scope) -> Result<usize, ControllerError<B>> {
        let submissions = self
            .request(self.inner.backend.fetch_submissions(scope))
            .await?;
        let count = self.inner.store.load(submissions).await?;
        Ok(count)
    }

    pub async fn subscribe(&self) -> Result<Consumer<B, S>, ControllerError<B>> {
        let subscription = self.request(self.inner.backend.subscribe()).await?;

        let subscription_id = subscription.id();
        let event_stream = subscription.events();

        {
            let mut subscriptions = self.inner.subscriptions.write().await;
            subscriptions.insert(subscription_id, subscription);
        }

        debug!(subscription_id, "subscribed to backend changes");
        Ok(Consumer::new(subscription_id, event_stream, self.clone()))
    }

    pub async fn unsubscribe(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<(), ControllerError<B>> {
        let mut subscriptions = self.inner.subscriptions.write().await;

        if let Some(subscription) = subscriptions.remove(&subscription_id) {
            subscription
                .unsubscribe()
                .await
                .map_err(ControllerError::Subscription)?;
        }

        Ok(())
    }

    /// Applies a workflow function to a submission and persists the result.
    ///
    /// Validation and transition errors are returned before anything is written. When the backend
    /// fails or does not answer in time the optimistic change is rolled back.
    pub async fn mutate<F>(&self, id: &SubmissionId, op: F) -> Result<Submission, ControllerError<B>>
    where
        F: FnOnce(&Submission, &Actor, Timestamp) -> Result<Submission, WorkflowError> + Send,
    {
        let lock = self.lock_for(id).await;
        let result = {
            let _guard = lock.clone().lock_owned().await;
            trace!(%id, "acquired write lock");
            self.mutate_locked(id, op).await
        };
        self.release_lock(id, lock).await;
        result
    }

    async fn mutate_locked<F>(
        &self,
        id: &SubmissionId,
        op: F,
    ) -> Result<Submission, ControllerError<B>>
    where
        F: FnOnce(&Submission, &Actor, Timestamp) -> Result<Submission, WorkflowError> + Send,
    {
        let actor = self.current_actor().await?;
        let previous = self
            .inner
            .store
            .submission(id)
            .await?
            .ok_or_else(|| ControllerError::NotFound(id.clone()))?;

        let next = op(&previous, &actor, Timestamp::advance_from(previous.last_updated))?;
        let comment = next
            .comments
            .iter()
            .find(|comment| !previous.has_comment(&comment.id))
            .cloned();

        self.inner
            .store
            .apply(Change::Optimistic(next.clone()))
            .await?;

        let mutation = Mutation {
            submission: next.clone(),
            expected_version: previous.version,
            comment,
        };

        match self.request(self.inner.backend.write(mutation)).await {
            Ok(confirmed) => {
                debug!(%id, version = confirmed.version, status = %confirmed.status, "write confirmed");
                self.inner
                    .store
                    .apply(Change::Replace(confirmed.clone()))
                    .await?;
                let current = self.inner.store.submission(id).await?;
                Ok(current.unwrap_or(confirmed))
            }
            Err(err) => {
                warn!(%id, %err, "write failed, roll back");
                self.inner
                    .store
                    .apply(Change::Restore {
                        previous,
                        failed: next,
                    })
                    .await?;
                Err(err)
            }
        }
    }

    /// Applies the same workflow function to many submissions, one after another.
    ///
    /// Every submission succeeds or fails on its own, a failure does not undo earlier successes
    /// and does not stop later ones.
    pub async fn mutate_many<F>(&self, ids: &[SubmissionId], op: F) -> BulkOutcome<B>
    where
        F: Fn(&Submission, &Actor, Timestamp) -> Result<Submission, WorkflowError> + Send + Sync,
    {
        let mut outcome = BulkOutcome {
            succeeded: Vec::with_capacity(ids.len()),
            failed: Vec::new(),
        };

        for id in ids {
            match self.mutate(id, &op).await {
                Ok(_) => outcome.succeeded.push(id.clone()),
                Err(err) => {
                    warn!(%id, %err, "bulk operation failed for submission");
                    outcome.failed.push((id.clone(), err));
                }
            }
        }

        outcome
    }

    async fn lock_for(&self, id: &SubmissionId) -> Arc<Mutex<()>> {
        let mut locks = self.inner.locks.lock().await;
        locks.entry(id.clone()).or_default().clone()
    }

    /// Removes the lock of a submission once nobody else waits for it.
    async fn release_lock(&self, id: &SubmissionId, lock: Arc<Mutex<()>>) {
        let mut locks = self.inner.locks.lock().await;
        // Held by the map and by us only.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(id);
        }
    }

    async fn request<T>(
        &self,
        future: impl Future<Output = Result<T, B::Error>>,
    ) -> Result<T, ControllerError<B>> {
        let timeout = self.inner.config.request_timeout;
        match tokio::time::timeout(timeout, future).await {
            Ok(result) => result.map_err(ControllerError::Backend),
            Err(_) => Err(ControllerError::Timeout(timeout)),
        }
    }
}

/// Result of a bulk operation.
pub struct BulkOutcome<B>
where
    B: Backend,
{
    pub succeeded: Vec<SubmissionId>,
    pub failed: Vec<(SubmissionId, ControllerError<B>)>,
}

impl<B> BulkOutcome<B>
where
    B: Backend,
{
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<B> fmt::Debug for BulkOutcome<B>
where
    B: Backend,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed: Vec<(&SubmissionId, String)> = self
            .failed
            .iter()
            .map(|(id, err)| (id, err.to_string()))
            .collect();
        f.debug_struct("BulkOutcome")
            .field("succeeded", &self.succeeded)
            .field("failed", &failed)
            .finish()
    }
}

#[derive(Error)]
pub enum ControllerError<B>
where
    B: Backend,
{
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("submission {0} not found")]
    NotFound(SubmissionId),

    #[error("{0}")]
    Backend(B::Error),

    #[error("{0}")]
    Subscription(<B::Subscription as Subscription>::Error),

    #[error("backend did not respond within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<B> fmt::Debug for ControllerError<B>
where
    B: Backend,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Workflow(err) => f.debug_tuple("Workflow").field(err).finish(),
            ControllerError::NotFound(id) => f.debug_tuple("NotFound").field(id).finish(),
            ControllerError::Backend(err) => f.debug_tuple("Backend").field(err).finish(),
            ControllerError::Subscription(err) => {
                f.debug_tuple("Subscription").field(err).finish()
            }
            ControllerError::Timeout(timeout) => f.debug_tuple("Timeout").field(timeout).finish(),
            ControllerError::Store(err) => f.debug_tuple("Store").field(err).finish(),
        }
    }
}
