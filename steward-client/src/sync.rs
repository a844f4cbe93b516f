// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merges change events pushed by the backend into the local store.
use std::fmt::Display;

use futures_core::Stream;
use futures_util::StreamExt;
use steward_store::{Applied, Change, StoreError, SubmissionStore};
use tracing::{debug, trace, warn};

use crate::backend::ChangeEvent;

/// Result of merging a single change event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied(Applied),

    /// Subscription lifecycle events do not touch the store.
    Ignored,
}

/// Applies remote change events to a store.
///
/// Updated submission rows replace the stored record unless they are older than it, inserted
/// comments are appended once. Events for submissions which are not loaded are ignored.
#[derive(Clone, Debug)]
pub struct SyncAdapter<S> {
    store: S,
}

impl<S> SyncAdapter<S>
where
    S: SubmissionStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn merge(&self, event: ChangeEvent) -> Result<MergeOutcome, StoreError> {
        let change = match event {
            ChangeEvent::SubmissionUpdated(submission) => Change::Replace(submission),
            ChangeEvent::CommentInserted(comment) => Change::AppendComment(comment),
            ChangeEvent::Subscribed { subscription_id } => {
                debug!(subscription_id, "sync started");
                return Ok(MergeOutcome::Ignored);
            }
            ChangeEvent::Unsubscribed => return Ok(MergeOutcome::Ignored),
        };

        let applied = self.store.apply(change).await?;
        trace!(?applied, "merged remote change");
        Ok(MergeOutcome::Applied(applied))
    }

    /// Merges events until the stream ends or the subscription is closed.
    ///
    /// Errors of single events are logged and skipped. Returns the number of events which
    /// changed the store.
    pub async fn run<St, E>(&self, mut stream: St) -> usize
    where
        St: Stream<Item = Result<ChangeEvent, E>> + Unpin,
        E: Display,
    {
        let mut merged = 0;

        while let Some(event) = stream.next().await {
            let event = match event {
                Ok(ChangeEvent::Unsubscribed) => break,
                Ok(event) => event,
                Err(err) => {
                    warn!(%err, "receiving remote change failed");
                    continue;
                }
            };

            match self.merge(event).await {
                Ok(MergeOutcome::Applied(Applied::Replaced | Applied::Appended)) => merged += 1,
                Ok(_) => (),
                Err(err) => warn!(%err, "merging remote change failed"),
            }
        }

        debug!(merged, "sync stopped");
        merged
    }
}
