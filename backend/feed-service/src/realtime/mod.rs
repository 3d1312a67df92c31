/// Realtime post events
///
/// A single broadcast channel fans post changes out to every connected
/// client. The process-wide handle is created once at startup with [`init`]
/// and looked up with [`get`]; components that receive the broadcaster
/// explicitly (services, tests) can also build their own with
/// [`Broadcaster::new`].
pub mod ws;

use crate::metrics::POST_EVENTS_TOTAL;
use crate::models::Post;
use futures_util::stream::{self, Stream};
use once_cell::sync::OnceCell;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

static BROADCASTER: OnceCell<Broadcaster> = OnceCell::new();

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RealtimeError {
    #[error("Realtime broadcaster is already initialized!")]
    AlreadyInitialized,

    #[error("Realtime broadcaster is not initialized!")]
    NotInitialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostAction {
    Create,
    Update,
    Delete,
}

impl PostAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostAction::Create => "create",
            PostAction::Update => "update",
            PostAction::Delete => "delete",
        }
    }
}

/// A change to a post. `post` is absent for deletions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEvent {
    pub action: PostAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Post>,
    pub post_id: Uuid,
}

impl PostEvent {
    pub fn created(post: Post) -> Self {
        Self {
            action: PostAction::Create,
            post_id: post.id,
            post: Some(post),
        }
    }

    pub fn updated(post: Post) -> Self {
        Self {
            action: PostAction::Update,
            post_id: post.id,
            post: Some(post),
        }
    }

    pub fn deleted(post_id: Uuid) -> Self {
        Self {
            action: PostAction::Delete,
            post: None,
            post_id,
        }
    }
}

/// Envelope written to socket clients: `{"event":"posts","data":{...}}`
#[derive(Serialize)]
struct SocketFrame<'a> {
    event: &'static str,
    data: &'a PostEvent,
}

impl PostEvent {
    pub fn to_socket_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(&SocketFrame {
            event: "posts",
            data: self,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<PostEvent>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PostEvent> {
        self.tx.subscribe()
    }

    /// Send to every current subscriber; returns how many received it.
    /// Having nobody listening is not an error.
    pub fn publish(&self, event: PostEvent) -> usize {
        POST_EVENTS_TOTAL
            .with_label_values(&[event.action.as_str()])
            .inc();

        let action = event.action;
        let post_id = event.post_id;
        let delivered = self.tx.send(event).unwrap_or(0);
        tracing::debug!(?action, %post_id, delivered, "post event published");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Subscribe as a stream. Lagging readers skip what they missed; the
    /// stream ends when the channel closes.
    pub fn stream(&self) -> impl Stream<Item = PostEvent> + Send + 'static {
        stream::unfold(self.subscribe(), |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "realtime subscriber lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }
}

/// Create the process-wide broadcaster
pub fn init(capacity: usize) -> Result<Broadcaster, RealtimeError> {
    let broadcaster = Broadcaster::new(capacity);
    BROADCASTER
        .set(broadcaster.clone())
        .map_err(|_| RealtimeError::AlreadyInitialized)?;
    tracing::info!(capacity, "realtime broadcaster initialized");
    Ok(broadcaster)
}

/// The process-wide broadcaster created by [`init`]. Request handlers take
/// the handle from `AppState`; this is for code running outside a request.
pub fn get() -> Result<Broadcaster, RealtimeError> {
    BROADCASTER
        .get()
        .cloned()
        .ok_or(RealtimeError::NotInitialized)
}
