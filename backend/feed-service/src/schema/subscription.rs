//! GraphQL subscriptions (WebSocket support)

use super::services;
use super::types::PostEventObject;
use crate::metrics::REALTIME_SUBSCRIBERS;
use crate::realtime::PostEvent;
use async_graphql::{Context, Result, Subscription};
use futures_util::stream::{BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

pub struct SubscriptionRoot;

/// Post events for one subscriber. Counted in the subscriber gauge for as
/// long as the stream is alive.
struct SubscriberStream {
    events: BoxStream<'static, PostEvent>,
}

impl SubscriberStream {
    fn new(events: BoxStream<'static, PostEvent>) -> Self {
        REALTIME_SUBSCRIBERS.inc();
        Self { events }
    }
}

impl Stream for SubscriberStream {
    type Item = PostEventObject;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        self.events
            .poll_next_unpin(cx)
            .map(|event| event.map(PostEventObject))
    }
}

impl Drop for SubscriberStream {
    fn drop(&mut self) {
        REALTIME_SUBSCRIBERS.dec();
    }
}

#[Subscription]
impl SubscriptionRoot {
    /// Every post created, updated or deleted after subscribing. Open to
    /// anonymous clients, like `/socket`.
    async fn posts(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = PostEventObject>> {
        let events = services(ctx)?.broadcaster.stream().boxed();
        Ok(SubscriberStream::new(events))
    }
}
