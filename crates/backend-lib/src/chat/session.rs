// ============================
// crates/backend-lib/src/chat/session.rs
// ============================
//! Per-connection session loop.
//!
//! A session joins the hub, then runs two halves until either stops:
//! a writer task that sends the replay followed by the live feed, and the
//! reader loop that decodes inbound frames and publishes them. Any read
//! error, decode error, close frame or idle timeout ends the session; the
//! hub registration is released exactly once on the way out.
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use chat_common::{ChatMessage, InboundFrame};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::hub::ChatHub;
use super::registry::Identity;

/// What an inbound frame means for the session
#[derive(Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Text to publish
    Publish(String),
    /// Control frame, nothing to do
    Ignore,
    /// Peer closed or sent something undecodable
    Close,
}

/// Classify one inbound frame. Malformed payloads close the session and
/// are never partially applied.
pub fn decode_frame(message: Message) -> FrameOutcome {
    let decoded = match message {
        Message::Text(text) => InboundFrame::decode(text.as_str()),
        Message::Binary(bytes) => InboundFrame::decode_bytes(&bytes),
        Message::Ping(_) | Message::Pong(_) => return FrameOutcome::Ignore,
        Message::Close(_) => return FrameOutcome::Close,
    };

    match decoded {
        Ok(frame) => FrameOutcome::Publish(frame.content),
        Err(e) => {
            debug!(error = %e, "malformed inbound frame");
            FrameOutcome::Close
        },
    }
}

/// Drive one admitted connection until it ends.
pub async fn run_session(
    socket: WebSocket,
    hub: ChatHub,
    identity: Identity,
    idle_timeout: Option<Duration>,
) {
    let subscription = hub.join(identity);
    let connection_id = subscription.id;
    let identity = subscription.identity;

    let (sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(sink, subscription.replay, subscription.receiver));

    loop {
        tokio::select! {
            outcome = next_frame(&mut stream, idle_timeout) => match outcome {
                FrameOutcome::Publish(content) => {
                    hub.publish(&identity, content);
                },
                FrameOutcome::Ignore => {},
                FrameOutcome::Close => break,
            },
            // Writer stopped: socket write failed or we were evicted
            _ = &mut writer => break,
        }
    }

    hub.leave(connection_id);
    writer.abort();
    debug!(connection_id = %connection_id, user = %identity, "session closed");
}

async fn next_frame(
    stream: &mut SplitStream<WebSocket>,
    idle_timeout: Option<Duration>,
) -> FrameOutcome {
    let next = match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
            Ok(next) => next,
            Err(_) => {
                debug!("idle timeout");
                return FrameOutcome::Close;
            },
        },
        None => stream.next().await,
    };

    match next {
        Some(Ok(message)) => decode_frame(message),
        Some(Err(e)) => {
            debug!(error = %e, "read failed");
            FrameOutcome::Close
        },
        None => FrameOutcome::Close,
    }
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    replay: Vec<ChatMessage>,
    mut receiver: mpsc::Receiver<ChatMessage>,
) {
    for message in &replay {
        if send_message(&mut sink, message).await.is_err() {
            return;
        }
    }

    while let Some(message) = receiver.recv().await {
        if send_message(&mut sink, &message).await.is_err() {
            return;
        }
    }

    // Queue closed: the hub dropped this connection
    let _ = sink.send(Message::Close(None)).await;
}

async fn send_message(
    sink: &mut SplitSink<WebSocket, Message>,
    message: &ChatMessage,
) -> Result<(), ()> {
    let json = match message.encode() {
        Ok(json) => json,
        Err(e) => {
            warn!(message_id = message.id, error = %e, "failed to encode message");
            return Err(());
        },
    };

    sink.send(Message::Text(json.into())).await.map_err(|e| {
        debug!(error = %e, "write failed");
    })
}
