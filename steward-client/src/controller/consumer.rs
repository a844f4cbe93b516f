// SPDX-License-Identifier: MIT OR Apache-2.0

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use steward_store::{MemoryStore, SubmissionStore};
use thiserror::Error;

use crate::backend::{Backend, ChangeEvent, Subscription, SubscriptionId};
use crate::controller::{Controller, ControllerError};

/// Stream of change events of one backend subscription.
pub struct Consumer<B, S = MemoryStore>
where
    B: Backend,
    S: SubmissionStore,
{
    subscription_id: SubscriptionId,
    controller: Controller<B, S>,
    event_stream: <B::Subscription as Subscription>::EventStream,
}

impl<B, S> Consumer<B, S>
where
    B: Backend,
    S: SubmissionStore + Sync + 'static,
{
    pub(crate) fn new(
        subscription_id: SubscriptionId,
        event_stream: <B::Subscription as Subscription>::EventStream,
        controller: Controller<B, S>,
    ) -> Self {
        Self {
            subscription_id,
            controller,
            event_stream,
        }
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    pub async fn unsubscribe(self) -> Result<(), ConsumerError<B>> {
        self.controller.unsubscribe(self.subscription_id).await?;
        drop(self);
        Ok(())
    }
}

impl<B, S> Stream for Consumer<B, S>
where
    B: Backend,
    S: SubmissionStore,
{
    type Item = Result<ChangeEvent, ConsumerError<B>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.event_stream).poll_next(cx) {
            Poll::Ready(Some(Ok(event))) => Poll::Ready(Some(Ok(event))),
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(ConsumerError::Subscription(err)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConsumerError<B>
where
    B: Backend,
{
    #[error(transparent)]
    Controller(#[from] ControllerError<B>),

    #[error("{0}")]
    Subscription(<B::Subscription as Subscription>::Error),
}
