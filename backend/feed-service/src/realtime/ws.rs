use super::PostEvent;
use crate::metrics::REALTIME_SUBSCRIBERS;
use crate::AppState;
use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use futures_util::stream::{BoxStream, StreamExt};
use std::time::{Duration, Instant};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// One connected `/socket` client. Receives every post event; anything the
/// client sends besides control frames is ignored.
struct PostsSocket {
    hb: Instant,
    events: Option<BoxStream<'static, PostEvent>>,
}

impl PostsSocket {
    fn new(events: BoxStream<'static, PostEvent>) -> Self {
        Self {
            hb: Instant::now(),
            events: Some(events),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!("WebSocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for PostsSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        REALTIME_SUBSCRIBERS.inc();
        tracing::info!("posts socket connected");

        self.hb(ctx);
        if let Some(events) = self.events.take() {
            ctx.add_stream(events);
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        REALTIME_SUBSCRIBERS.dec();
        tracing::info!("posts socket disconnected");
    }
}

impl StreamHandler<PostEvent> for PostsSocket {
    fn handle(&mut self, event: PostEvent, ctx: &mut Self::Context) {
        match event.to_socket_frame() {
            Ok(frame) => ctx.text(frame),
            Err(e) => tracing::error!(error = %e, "failed to encode post event"),
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for PostsSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(?reason, "WebSocket close message received");
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "WebSocket protocol error");
                ctx.stop();
            }
        }
    }
}

/// GET /socket
pub async fn socket_route(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let events = state.broadcaster.stream().boxed();
    ws::start(PostsSocket::new(events), &req, stream)
}
