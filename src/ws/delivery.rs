//! Per-connection delivery loop.
//!
//! Two tasks cooperate through one cancellation token:
//! - the writer (this loop) relays notifications and sends keepalive pings
//! - the reader drains incoming frames only to notice the peer going away
//!
//! Whichever side stops first cancels the token. The writer then runs the
//! single teardown: unsubscribe, close frame, close the sink.

use std::fmt::Display;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, close_code};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::{Instant, interval_at, timeout};
use tokio_util::sync::CancellationToken;

use super::message::ServerMessage;
use crate::broadcast::Broadcaster;

/// Default keepalive interval.
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound for each teardown step (close frame, sink close).
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Why a delivery loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the connection or reading from it failed.
    Disconnected,
    /// The connection or server token was cancelled.
    Shutdown,
    /// Sending a keepalive ping failed.
    PingFailed,
    /// Sending a notification failed.
    WriteFailed,
    /// The subscriber inbox was closed from outside.
    Unsubscribed,
}

/// How the reader task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderExit {
    PeerClosed,
    ReadError,
    Stopped,
}

/// Bridges one broadcaster subscription to one outbound connection.
#[derive(Debug, Clone)]
pub struct DeliveryLoop {
    broadcaster: Broadcaster,
    ping_interval: Duration,
}

impl DeliveryLoop {
    pub fn new(broadcaster: Broadcaster) -> Self {
        Self {
            broadcaster,
            ping_interval: PING_INTERVAL,
        }
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Run until the peer disconnects, a send fails or `ct` is cancelled.
    ///
    /// Subscribes on entry and unsubscribes exactly once on exit, whichever
    /// branch ends the loop.
    pub async fn run<S, R, E>(self, mut sink: S, stream: R, ct: CancellationToken) -> CloseReason
    where
        S: Sink<Message> + Unpin,
        S::Error: Display,
        R: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
        E: Display + Send + 'static,
    {
        let mut subscriber = self.broadcaster.subscribe();
        let id = subscriber.id();
        crate::log_event!(
            "ws",
            "client connected",
            "#{id}, {} active",
            self.broadcaster.subscriber_count()
        );
        let reader = tokio::spawn(read_until_closed(stream, ct.clone()));

        let mut ping = interval_at(Instant::now() + self.ping_interval, self.ping_interval);

        let mut reason = loop {
            tokio::select! {
                _ = ct.cancelled() => break CloseReason::Shutdown,

                _ = ping.tick() => {
                    match send_unless_cancelled(&mut sink, Message::Ping(Bytes::new()), &ct).await {
                        Sent::Done => crate::debug_event!("ws", "ping", "#{id}"),
                        Sent::Cancelled => break CloseReason::Shutdown,
                        Sent::Failed(e) => {
                            crate::debug_event!("ws", "ping failed", "#{id}: {e}");
                            break CloseReason::PingFailed;
                        }
                    }
                }

                msg = subscriber.recv() => {
                    let Some(path) = msg else {
                        break CloseReason::Unsubscribed;
                    };
                    crate::debug_event!("ws", "file change", "#{id} {path}");

                    let text = match ServerMessage::FileChange(path).to_json() {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!("[ws] failed to encode message: {e}");
                            continue;
                        }
                    };
                    match send_unless_cancelled(&mut sink, Message::Text(text.into()), &ct).await {
                        Sent::Done => {}
                        Sent::Cancelled => break CloseReason::Shutdown,
                        Sent::Failed(e) => {
                            crate::debug_event!("ws", "write failed", "#{id}: {e}");
                            break CloseReason::WriteFailed;
                        }
                    }
                }
            }
        };

        ct.cancel();
        self.broadcaster.unsubscribe(&mut subscriber);

        // The peer may have stopped reading; never wait on it indefinitely
        let close = Message::Close(Some(CloseFrame {
            code: close_code::NORMAL,
            reason: Utf8Bytes::from_static(""),
        }));
        match timeout(CLOSE_TIMEOUT, sink.send(close)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => crate::debug_event!("ws", "close frame not sent", "#{id}: {e}"),
            Err(_) => crate::debug_event!("ws", "close frame not sent", "#{id}: timed out"),
        }
        match timeout(CLOSE_TIMEOUT, sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => crate::debug_event!("ws", "close failed", "#{id}: {e}"),
            Err(_) => crate::debug_event!("ws", "close failed", "#{id}: timed out"),
        }

        match reader.await {
            Ok(ReaderExit::PeerClosed | ReaderExit::ReadError)
                if reason == CloseReason::Shutdown =>
            {
                reason = CloseReason::Disconnected;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("[ws] reader task failed: {e}"),
        }

        reason
    }
}

/// Outcome of one outbound send raced against cancellation.
enum Sent<E> {
    Done,
    Cancelled,
    Failed(E),
}

async fn send_unless_cancelled<S>(
    sink: &mut S,
    msg: Message,
    ct: &CancellationToken,
) -> Sent<S::Error>
where
    S: Sink<Message> + Unpin,
{
    tokio::select! {
        _ = ct.cancelled() => Sent::Cancelled,
        res = sink.send(msg) => match res {
            Ok(()) => Sent::Done,
            Err(e) => Sent::Failed(e),
        },
    }
}

/// Drain incoming frames, discarding their content, until the peer closes,
/// reading fails or `ct` is cancelled. Cancels `ct` on the way out.
async fn read_until_closed<R, E>(mut stream: R, ct: CancellationToken) -> ReaderExit
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let exit = loop {
        tokio::select! {
            _ = ct.cancelled() => break ReaderExit::Stopped,

            frame = stream.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break ReaderExit::PeerClosed,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    crate::debug_event!("ws", "read failed", "{e}");
                    break ReaderExit::ReadError;
                }
            },
        }
    };

    ct.cancel();
    exit
}
