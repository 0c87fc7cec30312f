//! WebSocket signaling endpoint.
//!
//! `GET /ws/{code}?token=<jwt>` upgrades to a WebSocket bound to room `code`.
//!
//! # Handshake
//!
//! The token is verified before the upgrade is accepted. A rejected
//! connection is still upgraded, then immediately closed with code 4401 and
//! reason `"unauthorized"`, so browser clients can read the close code.
//! A WebSocket close code only exists on an open socket; a plain HTTP
//! refusal surfaces in browsers as a bare 1006 with no code or reason.
//! Nothing is registered for a rejected connection.
//!
//! # Framing
//!
//! - Text frames must be JSON; they are relayed verbatim
//! - Binary frames and non-JSON text end the session
//! - Ping/pong is handled by the WebSocket layer

use crate::errors::{AuthError, ProtocolError};
use crate::relay::{InboundStream, PeerSession, SignalingMessage, SignalingRelay};
use crate::routes::AppState;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::secret::bearer_token;
use common::types::RoomCode;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{instrument, Instrument};

/// How long to wait for a close frame to flush before dropping the socket.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Query parameters for the signaling endpoint.
///
/// Deliberately not `Debug`: the token must never be logged.
#[derive(Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// Handler for GET /ws/{code}
///
/// Rejected tokens still upgrade: 4401 can only travel in a close frame.
#[instrument(skip_all, name = "relay.ws.connect", fields(room = %code))]
pub async fn signaling_ws(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Response {
    if state.relay.is_shutting_down() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let room = RoomCode::from(code);
    let token = bearer_token(params.token.as_deref());
    let ws = ws.max_message_size(state.config.max_message_bytes);
    let span = tracing::Span::current();

    match state.relay.authenticate(token.as_ref()) {
        Ok(claims) => {
            tracing::debug!(target: "relay.ws", claims = ?claims, "Token accepted");
            let relay = Arc::clone(&state.relay);
            ws.on_upgrade(move |socket| serve_connection(relay, room, socket).instrument(span))
        }
        Err(e) => ws.on_upgrade(move |socket| reject(socket, e).instrument(span)),
    }
}

/// Close an upgraded socket that failed authentication.
async fn reject(mut socket: WebSocket, err: AuthError) {
    let frame = CloseFrame {
        code: err.close_code(),
        reason: Cow::Borrowed(err.client_message()),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!(target: "relay.ws", error = %e, "Failed to send auth close frame");
    }
}

/// Run a verified connection until it ends.
async fn serve_connection(relay: Arc<SignalingRelay>, room: RoomCode, socket: WebSocket) {
    let (session, outbound) = relay.open_session(room);
    let (sink, stream) = socket.split();

    let writer = tokio::spawn(
        write_outbound(Arc::clone(&session), outbound, sink).in_current_span(),
    );

    relay.run(Arc::clone(&session), inbound_frames(stream)).await;

    if let Err(e) = writer.await {
        tracing::error!(target: "relay.ws", error = %e, "Writer task failed");
    }
}

/// Decode inbound WebSocket frames into relayable messages.
///
/// The stream ends on a close frame or a transport error.
fn inbound_frames(stream: SplitStream<WebSocket>) -> InboundStream {
    futures::stream::unfold(stream, |mut stream| async move {
        loop {
            let item = match stream.next().await {
                Some(Ok(Message::Text(text))) => SignalingMessage::parse(text),
                Some(Ok(Message::Binary(_))) => Err(ProtocolError::BinaryFrame),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Err(e)) => {
                    tracing::debug!(target: "relay.ws", error = %e, "WebSocket read failed");
                    return None;
                }
            };
            return Some((item, stream));
        }
    })
    .boxed()
}

/// Drain a session's outbound queue into the socket.
///
/// Stops when the session closes or the socket rejects a write, then sends a
/// normal close frame.
async fn write_outbound(
    session: Arc<PeerSession>,
    mut outbound: mpsc::Receiver<SignalingMessage>,
    mut sink: SplitSink<WebSocket, Message>,
) {
    loop {
        let message = tokio::select! {
            biased;

            () = session.closed() => break,
            next = outbound.recv() => match next {
                Some(message) => message,
                None => break,
            },
        };

        tokio::select! {
            biased;

            () = session.closed() => break,
            result = sink.send(Message::Text(message.as_str().to_owned())) => {
                if let Err(e) = result {
                    tracing::debug!(target: "relay.ws", error = %e, "WebSocket write failed");
                    session.close();
                    break;
                }
            }
        }
    }

    let frame = CloseFrame {
        code: close_code::NORMAL,
        reason: Cow::Borrowed(""),
    };
    // The peer may already be gone; the close frame is best-effort.
    let _ = tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, sink.send(Message::Close(Some(frame)))).await;
}
