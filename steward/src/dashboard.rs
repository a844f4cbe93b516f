// SPDX-License-Identifier: MIT OR Apache-2.0

use steward_client::{
    Backend, BulkOutcome, Controller, ControllerError, SubscriptionId, SyncAdapter,
};
use steward_core::validate::validate_message;
use steward_core::{
    Actor, EscalationTarget, Policy, Submission, SubmissionId, TimelineEvent, Timestamp,
    WorkflowError, build_timeline, workflow,
};
use steward_store::query::{FilterError, FilterField, PageView, Query, SortKey};
use steward_store::views::{self, DashboardStats, ReviewerWorkload, SlaStatus};
use steward_store::{MemoryStore, StoreEvent, SubmissionStore};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::notification::Notification;

/// Approval dashboard over the submissions of a backend.
///
/// Holds the authoritative in-memory collection, keeps it in sync with the backend in a
/// background task and exposes the workflow operations, the queue query and the aggregated views.
pub struct Dashboard<B>
where
    B: Backend,
{
    controller: Controller<B>,
    policy: Policy,
    config: DashboardConfig,
    query: Query,
    subscription_id: SubscriptionId,
    sync: JoinHandle<usize>,
}

impl<B> Dashboard<B>
where
    B: Backend,
{
    pub async fn spawn(backend: B) -> Result<Self, DashboardError<B>> {
        Self::spawn_inner(DashboardConfig::default(), Policy::default(), backend).await
    }

    pub(crate) async fn spawn_inner(
        config: DashboardConfig,
        policy: Policy,
        backend: B,
    ) -> Result<Self, DashboardError<B>> {
        let controller = Controller::new(backend, MemoryStore::new(), config.client.clone());

        // Changes arriving during the load queue up in the subscription.
        let consumer = controller.subscribe().await?;
        let subscription_id = consumer.subscription_id();
        let count = controller.load(config.scope.clone()).await?;
        info!(count, scope = ?config.scope, "loaded submissions");

        let adapter = SyncAdapter::new(controller.store().clone());
        let sync = tokio::spawn(async move { adapter.run(consumer).await });

        Ok(Self {
            controller,
            policy,
            query: Query::new(config.page_size),
            config,
            subscription_id,
            sync,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn store(&self) -> &MemoryStore {
        self.controller.store()
    }

    pub async fn current_actor(&self) -> Result<Actor, DashboardError<B>> {
        Ok(self.controller.current_actor().await?)
    }

    /// Fetches the whole collection again, replacing the local state.
    pub async fn reload(&self) -> Result<usize, DashboardError<B>> {
        Ok(self.controller.load(self.config.scope.clone()).await?)
    }

    pub fn submission(&self, id: &SubmissionId) -> Option<Submission> {
        self.store().read_store().get(id).cloned()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.store().snapshot()
    }

    pub async fn approve(
        &self,
        id: &SubmissionId,
        comment: &str,
    ) -> Result<Submission, DashboardError<B>> {
        let submission = self
            .controller
            .mutate(id, |submission, actor, now| {
                workflow::approve(submission, actor, comment, now)
            })
            .await?;
        Ok(submission)
    }

    pub async fn reject(
        &self,
        id: &SubmissionId,
        comment: &str,
    ) -> Result<Submission, DashboardError<B>> {
        let submission = self
            .controller
            .mutate(id, |submission, actor, now| {
                workflow::reject(submission, actor, comment, now)
            })
            .await?;
        Ok(submission)
    }

    pub async fn request_revision(
        &self,
        id: &SubmissionId,
        comment: &str,
        refer_to: &str,
    ) -> Result<Submission, DashboardError<B>> {
        let submission = self
            .controller
            .mutate(id, |submission, actor, now| {
                workflow::request_revision(submission, actor, comment, refer_to, now)
            })
            .await?;
        Ok(submission)
    }

    pub async fn add_comment(
        &self,
        id: &SubmissionId,
        message: &str,
        phase: Option<&str>,
    ) -> Result<Submission, DashboardError<B>> {
        let role = self.config.role;
        let submission = self
            .controller
            .mutate(id, |submission, actor, now| {
                workflow::add_comment(submission, actor, role, message, phase, now)
            })
            .await?;
        Ok(submission)
    }

    pub async fn escalate(
        &self,
        id: &SubmissionId,
        reason: &str,
        target: Option<EscalationTarget>,
    ) -> Result<Submission, DashboardError<B>> {
        let submission = self
            .controller
            .mutate(id, |submission, actor, now| {
                workflow::escalate(submission, actor, reason, target, now)
            })
            .await?;
        Ok(submission)
    }

    pub async fn start_review(&self, id: &SubmissionId) -> Result<Submission, DashboardError<B>> {
        let submission = self
            .controller
            .mutate(id, |submission, actor, now| {
                workflow::start_review(submission, actor, now)
            })
            .await?;
        Ok(submission)
    }

    /// Evaluates the auto-approval rules again and approves the submission when one matches.
    pub async fn retry_auto_approval(
        &self,
        id: &SubmissionId,
    ) -> Result<Submission, DashboardError<B>> {
        let policy = &self.policy;
        let submission = self
            .controller
            .mutate(id, |submission, _actor, now| {
                workflow::retry_auto_approval(submission, policy, now)
            })
            .await?;
        Ok(submission)
    }

    /// Assigns reviewer, priority and tags from the routing rules.
    pub async fn apply_routing(&self, id: &SubmissionId) -> Result<Submission, DashboardError<B>> {
        let policy = &self.policy;
        let submission = self
            .controller
            .mutate(id, |submission, _actor, now| {
                Ok(workflow::apply_routing(submission, policy, now))
            })
            .await?;
        Ok(submission)
    }

    /// Approves every listed submission with the same comment.
    ///
    /// An invalid comment fails the whole operation before anything is written. Otherwise every
    /// submission is handled on its own and the outcome lists which ones failed.
    pub async fn bulk_approve(
        &self,
        ids: &[SubmissionId],
        comment: &str,
    ) -> Result<BulkOutcome<B>, DashboardError<B>> {
        validate_bulk_comment::<B>(comment)?;
        let outcome = self
            .controller
            .mutate_many(ids, |submission, actor, now| {
                workflow::approve(submission, actor, comment, now)
            })
            .await;
        debug!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk approve"
        );
        Ok(outcome)
    }

    /// Rejects every listed submission with the same comment, see [`Dashboard::bulk_approve`].
    pub async fn bulk_reject(
        &self,
        ids: &[SubmissionId],
        comment: &str,
    ) -> Result<BulkOutcome<B>, DashboardError<B>> {
        validate_bulk_comment::<B>(comment)?;
        let outcome = self
            .controller
            .mutate_many(ids, |submission, actor, now| {
                workflow::reject(submission, actor, comment, now)
            })
            .await;
        debug!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk reject"
        );
        Ok(outcome)
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn set_filter(&mut self, field: FilterField, value: &str) -> Result<(), DashboardError<B>> {
        self.query.set_filter(field, value)?;
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        self.query.clear_filters();
    }

    pub fn toggle_sort(&mut self, key: SortKey) {
        self.query.toggle_sort(key);
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.query.go_to_page(page);
    }

    /// Current page of the filtered and sorted queue.
    pub fn page(&mut self) -> PageView<Submission> {
        let store = self.controller.store().read_store();
        self.query.run(store.submissions())
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats::from_submissions(self.store().read_store().submissions())
    }

    pub fn approval_rate(&self) -> Option<u8> {
        self.stats().approval_rate()
    }

    pub fn pending_by_reviewer(&self) -> Vec<ReviewerWorkload> {
        views::pending_by_reviewer(
            self.store().read_store().submissions(),
            Timestamp::now(),
            &self.config.views,
        )
    }

    pub fn sla_status(&self, id: &SubmissionId) -> Option<SlaStatus> {
        let store = self.store().read_store();
        views::sla_status(store.get(id)?, Timestamp::now())
    }

    pub fn timeline(&self, id: &SubmissionId) -> Option<Vec<TimelineEvent>> {
        self.store().read_store().get(id).map(build_timeline)
    }

    /// Raw change events of the local collection.
    pub fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.store().subscribe()
    }

    /// User-facing notifications about changes of the local collection.
    pub fn notifications(&self) -> impl Stream<Item = Notification> + Send + Unpin + 'static {
        BroadcastStream::new(self.events()).filter_map(|event| {
            event
                .ok()
                .and_then(|event| Notification::from_event(&event))
        })
    }

    /// Stops following backend changes. Returns the number of merged remote changes.
    pub async fn shutdown(mut self) -> Result<usize, DashboardError<B>> {
        self.controller.unsubscribe(self.subscription_id).await?;

        let timeout = self.config.client.request_timeout;
        match tokio::time::timeout(timeout, &mut self.sync).await {
            Ok(merged) => Ok(merged?),
            Err(_) => {
                warn!("sync task did not stop in time, abort");
                self.sync.abort();
                Ok(0)
            }
        }
    }
}

impl<B> Drop for Dashboard<B>
where
    B: Backend,
{
    fn drop(&mut self) {
        self.sync.abort();
    }
}

fn validate_bulk_comment<B>(comment: &str) -> Result<(), ControllerError<B>>
where
    B: Backend,
{
    validate_message("comment", comment).map_err(WorkflowError::from)?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum DashboardError<B>
where
    B: Backend,
{
    #[error(transparent)]
    Controller(#[from] ControllerError<B>),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("sync task failed: {0}")]
    Sync(#[from] JoinError),
}

impl<B> DashboardError<B>
where
    B: Backend,
{
    /// Validation, transition or auto-approval error, if this is one.
    pub fn workflow(&self) -> Option<&WorkflowError> {
        match self {
            DashboardError::Controller(ControllerError::Workflow(err)) => Some(err),
            _ => None,
        }
    }
}
