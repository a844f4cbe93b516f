// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for mocking backend implementations.
//!
//! The mock backend keeps submission rows in memory, checks row versions on every write and
//! pushes accepted writes to all active subscriptions, just like a real backend echoes changes.
//! Tests drive failures, delays and remote edits through [`MockBackendHandle`].
use std::collections::HashMap;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use anyhow::{Result, bail};
use futures_core::Stream;
use steward_core::{Actor, Comment, Submission, SubmissionId};
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};
use tokio_stream::wrappers::BroadcastStream;

use crate::backend::{Backend, ChangeEvent, Mutation, Scope, Subscription, SubscriptionId};

#[derive(Debug, Clone, PartialEq)]
enum SubscriptionState {
    Active,
    Unsubscribing,
    Unsubscribed,
}

#[derive(Debug)]
struct SubscriptionHandle {
    tx: broadcast::Sender<ChangeEvent>,
    state: SubscriptionState,
}

#[derive(Debug)]
struct MockBackendState {
    actor: Actor,
    rows: Vec<Submission>,
    next_subscription_id: SubscriptionId,
    subscriptions: HashMap<SubscriptionId, SubscriptionHandle>,
    fail_next_writes: usize,
    write_delay: Option<Duration>,
    writes: Vec<Mutation>,
}

impl MockBackendState {
    fn new(actor: Actor, rows: Vec<Submission>) -> Self {
        Self {
            actor,
            rows,
            next_subscription_id: 1,
            subscriptions: HashMap::new(),
            fail_next_writes: 0,
            write_delay: None,
            writes: Vec::new(),
        }
    }

    fn row_mut(&mut self, id: &SubmissionId) -> Option<&mut Submission> {
        self.rows.iter_mut().find(|row| row.id == *id)
    }

    fn broadcast(&self, event: ChangeEvent) {
        for handle in self.subscriptions.values() {
            if handle.state == SubscriptionState::Active {
                let _ = handle.tx.send(event.clone());
            }
        }
    }

    /// Pushes a row the way a database change feed does: without its comments.
    fn broadcast_row(&self, row: &Submission) {
        let mut row = row.clone();
        row.comments.clear();
        self.broadcast(ChangeEvent::SubmissionUpdated(row));
    }
}

#[derive(Debug, Error)]
pub enum MockBackendError {
    #[error("injected write failure")]
    Injected,

    #[error("version conflict, expected {expected} but row is at {actual}")]
    Conflict { expected: u64, actual: u64 },

    #[error("row {0} does not exist")]
    NotFound(SubmissionId),
}

#[derive(Debug)]
pub struct MockEventStream {
    stream: BroadcastStream<ChangeEvent>,
}

impl MockEventStream {
    pub fn new(rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self {
            stream: BroadcastStream::new(rx),
        }
    }
}

impl Stream for MockEventStream {
    type Item = Result<ChangeEvent, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.stream).poll_next(cx) {
            Poll::Ready(Some(Ok(event))) => Poll::Ready(Some(Ok(event))),
            Poll::Ready(Some(Err(_))) => {
                // Any error from broadcast stream (lagged, closed) - end the stream.
                Poll::Ready(None)
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Unpin for MockEventStream {}

#[derive(Debug)]
pub struct MockSubscription {
    id: SubscriptionId,
    backend_state: Arc<Mutex<MockBackendState>>,
}

impl MockSubscription {
    fn new(id: SubscriptionId, backend_state: Arc<Mutex<MockBackendState>>) -> Self {
        Self { id, backend_state }
    }
}

impl Subscription for MockSubscription {
    type Error = Infallible;

    type EventStream = MockEventStream;

    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn events(&self) -> Self::EventStream {
        let state = self.backend_state.try_lock().unwrap();

        if let Some(handle) = state.subscriptions.get(&self.id) {
            let rx = handle.tx.subscribe();
            let tx = handle.tx.clone();

            let subscription_id = self.id;

            drop(state);

            let _ = tx.send(ChangeEvent::Subscribed { subscription_id });

            MockEventStream::new(rx)
        } else {
            panic!("subscription should exist");
        }
    }

    async fn unsubscribe(self) -> Result<(), Self::Error> {
        let mut state = self.backend_state.lock().await;

        if let Some(handle) = state.subscriptions.get_mut(&self.id) {
            match handle.state {
                SubscriptionState::Active => {
                    handle.state = SubscriptionState::Unsubscribing;
                    let _ = handle.tx.send(ChangeEvent::Unsubscribed);
                }
                SubscriptionState::Unsubscribing | SubscriptionState::Unsubscribed => {
                    // Nothing to do anymore ..
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct MockBackend {
    state: Arc<Mutex<MockBackendState>>,
}

impl MockBackend {
    pub fn new(actor: Actor, rows: Vec<Submission>) -> (Self, MockBackendHandle) {
        let state = Arc::new(Mutex::new(MockBackendState::new(actor, rows)));

        let backend = Self {
            state: state.clone(),
        };

        let handle = MockBackendHandle {
            state: state.clone(),
        };

        (backend, handle)
    }
}

#[derive(Clone, Debug)]
pub struct MockBackendHandle {
    state: Arc<Mutex<MockBackendState>>,
}

impl MockBackendHandle {
    /// Let the next `count` writes fail.
    pub async fn fail_next_writes(&self, count: usize) {
        let mut state = self.state.lock().await;
        state.fail_next_writes = count;
    }

    /// Delay every write by the given duration.
    pub async fn set_write_delay(&self, delay: Option<Duration>) {
        let mut state = self.state.lock().await;
        state.write_delay = delay;
    }

    /// All write attempts which reached the backend.
    pub async fn writes(&self) -> Vec<Mutation> {
        let state = self.state.lock().await;
        state.writes.clone()
    }

    /// Current row as stored by the backend.
    pub async fn row(&self, id: &SubmissionId) -> Option<Submission> {
        let mut state = self.state.lock().await;
        state.row_mut(id).map(|row| row.clone())
    }

    /// Change a row from "another client" and push it to all active subscriptions.
    pub async fn remote_update<F>(&self, id: &SubmissionId, update: F) -> Result<Submission>
    where
        F: FnOnce(&mut Submission),
    {
        let mut state = self.state.lock().await;

        let Some(row) = state.row_mut(id) else {
            bail!("row not found")
        };

        update(row);
        row.version += 1;
        let row = row.clone();

        state.broadcast_row(&row);
        Ok(row)
    }

    /// Insert a comment from "another client" and push it to all active subscriptions.
    pub async fn remote_comment(&self, comment: Comment) -> Result<()> {
        let mut state = self.state.lock().await;

        let Some(row) = state.row_mut(&comment.submission_id) else {
            bail!("row not found")
        };

        row.comments.push(comment.clone());
        state.broadcast(ChangeEvent::CommentInserted(comment));
        Ok(())
    }

    /// Send an event to all active subscriptions.
    pub async fn send_to_all_subscriptions(&self, event: ChangeEvent) -> Result<()> {
        let state = self.state.lock().await;

        for handle in state.subscriptions.values() {
            if handle.state == SubscriptionState::Active && handle.tx.send(event.clone()).is_err()
            {
                bail!("no receivers listening")
            }
        }

        Ok(())
    }

    /// Get all active subscription ids.
    pub async fn active_subscription_ids(&self) -> Vec<SubscriptionId> {
        let state = self.state.lock().await;
        state
            .subscriptions
            .iter()
            .filter(|(_, data)| data.state == SubscriptionState::Active)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl Backend for MockBackend {
    type Error = MockBackendError;

    type Subscription = MockSubscription;

    async fn current_actor(&self) -> Result<Actor, Self::Error> {
        let state = self.state.lock().await;
        Ok(state.actor.clone())
    }

    async fn fetch_submissions(&self, scope: Scope) -> Result<Vec<Submission>, Self::Error> {
        let state = self.state.lock().await;
        Ok(state
            .rows
            .iter()
            .filter(|row| scope.includes(row))
            .cloned()
            .collect())
    }

    async fn write(&self, mutation: Mutation) -> Result<Submission, Self::Error> {
        let delay = self.state.lock().await.write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        state.writes.push(mutation.clone());

        if state.fail_next_writes > 0 {
            state.fail_next_writes -= 1;
            return Err(MockBackendError::Injected);
        }

        let id = mutation.submission.id.clone();
        let Some(row) = state.row_mut(&id) else {
            return Err(MockBackendError::NotFound(id));
        };

        if row.version != mutation.expected_version {
            return Err(MockBackendError::Conflict {
                expected: mutation.expected_version,
                actual: row.version,
            });
        }

        let mut stored = mutation.submission;
        stored.version = row.version + 1;
        *row = stored.clone();

        state.broadcast_row(&stored);
        if let Some(comment) = mutation.comment {
            state.broadcast(ChangeEvent::CommentInserted(comment));
        }

        Ok(stored)
    }

    async fn subscribe(&self) -> Result<Self::Subscription, Self::Error> {
        let mut state = self.state.lock().await;

        let subscription_id = state.next_subscription_id;
        state.next_subscription_id += 1;

        let (tx, _) = broadcast::channel(128);

        let handle = SubscriptionHandle {
            tx,
            state: SubscriptionState::Active,
        };

        state.subscriptions.insert(subscription_id, handle);

        Ok(MockSubscription::new(subscription_id, self.state.clone()))
    }
}
