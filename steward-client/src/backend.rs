// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;
use std::future::Future;

use futures_core::Stream;
use serde::{Deserialize, Serialize};
use steward_core::{Actor, ActorId, Comment, Submission};

pub type SubscriptionId = u64;

/// Change notification pushed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChangeEvent {
    Subscribed {
        subscription_id: SubscriptionId,
    },

    /// A submission row was updated. The row does not necessarily include its comments.
    SubmissionUpdated(Submission),

    /// A comment row was inserted.
    CommentInserted(Comment),

    Unsubscribed,
}

/// Which submissions to load, mirrors the row-level access rules of the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Everything, as seen by data stewards.
    #[default]
    All,

    /// Asset registrations of one producer.
    Producer(ActorId),

    /// Access requests of one consumer.
    Requester(ActorId),
}

impl Scope {
    pub fn includes(&self, submission: &Submission) -> bool {
        use steward_core::RequestKind;

        match self {
            Scope::All => true,
            Scope::Producer(id) => {
                submission.request_kind == RequestKind::AssetRegistration
                    && submission.producer_id == *id
            }
            Scope::Requester(id) => {
                matches!(submission.request_kind, RequestKind::AccessRequest { .. })
                    && submission.producer_id == *id
            }
        }
    }
}

/// Single atomic write: the updated submission row plus an optional new comment row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub submission: Submission,

    /// Version the row had when the mutation was computed. The write fails when the stored row
    /// moved on in the meantime.
    pub expected_version: u64,

    pub comment: Option<Comment>,
}

/// Remote service holding the submissions.
pub trait Backend: Send + Sync + 'static {
    type Error: Error + Send + Sync + 'static;

    type Subscription: Subscription;

    /// Authenticated actor all writes are attributed to.
    fn current_actor(&self) -> impl Future<Output = Result<Actor, Self::Error>> + Send;

    fn fetch_submissions(
        &self,
        scope: Scope,
    ) -> impl Future<Output = Result<Vec<Submission>, Self::Error>> + Send;

    /// Persists a mutation and returns the stored row.
    fn write(
        &self,
        mutation: Mutation,
    ) -> impl Future<Output = Result<Submission, Self::Error>> + Send;

    fn subscribe(&self) -> impl Future<Output = Result<Self::Subscription, Self::Error>> + Send;
}

pub trait Subscription: Send + Sync + 'static {
    type Error: Error + Send + Sync + 'static;

    type EventStream: Stream<Item = Result<ChangeEvent, Self::Error>> + Send + Unpin;

    fn id(&self) -> SubscriptionId;

    fn events(&self) -> Self::EventStream;

    fn unsubscribe(self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
