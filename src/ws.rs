//! WebSocket upgrade handling and the per-connection pumps.
//!
//! Every accepted socket becomes one hub registration plus two tasks: a
//! read pump that forwards incoming frames to [`Hub::broadcast`], and a
//! write pump that drains the connection's outbox onto the wire. Either
//! pump stopping tears the whole connection down.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::hub::{ConnId, Frame, Hub};

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(data) => Message::Binary(data.into()),
        }
    }
}

/// WebSocket upgrade handler for `GET /ws`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Arc<Hub>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Run one client connection from registration to teardown.
async fn handle_socket(socket: WebSocket, hub: Arc<Hub>) {
    let (sink, stream) = socket.split();

    // Register before either pump starts, so the connection is eligible
    // for broadcasts from its very first frame onward.
    let (id, outbox) = hub.register().await;
    tracing::info!(conn = id, "client connected");

    let mut write_task = tokio::spawn(write_pump(outbox, sink));
    let mut read_task = tokio::spawn(read_pump(hub.clone(), id, stream));

    // Whichever pump stops first (remote close, transport error, or the
    // hub closing the outbox on eviction) ends the connection.
    tokio::select! {
        _ = &mut write_task => read_task.abort(),
        _ = &mut read_task => write_task.abort(),
    }

    // No-op if the hub already evicted this connection.
    hub.unregister(id).await;
    tracing::info!(conn = id, "client disconnected");
}

/// Forward every incoming Text/Binary frame to the hub.
async fn read_pump(hub: Arc<Hub>, id: ConnId, mut stream: SplitStream<WebSocket>) {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                tracing::debug!(conn = id, len = text.len(), "relaying text frame");
                hub.broadcast(id, Frame::Text(text.as_str().to_owned())).await;
            }
            Ok(Message::Binary(data)) => {
                tracing::debug!(conn = id, len = data.len(), "relaying binary frame");
                hub.broadcast(id, Frame::Binary(data.to_vec())).await;
            }
            Ok(Message::Close(_)) => break,
            // Ping/Pong are answered by axum itself.
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn = id, error = %e, "websocket read error");
                break;
            }
        }
    }
}

/// Drain the outbox onto the wire until it closes or a write fails.
///
/// A write failure just stops the pump; unregistration is owned by the
/// connection teardown in `handle_socket` and by broadcast-time eviction.
async fn write_pump(mut outbox: mpsc::Receiver<Frame>, mut sink: SplitSink<WebSocket, Message>) {
    while let Some(frame) = outbox.recv().await {
        if sink.send(frame.into()).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}
