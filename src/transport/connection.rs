//! One WebSocket connection attempt.
//!
//! Opens a WebSocket to a single candidate URI and feeds its lifecycle
//! into the [`Handshake`] until the connection ends or shutdown is
//! signalled. The caller (the connection manager) decides what to try next
//! from the returned [`Termination`].
//!
//! # Event Loop
//!
//! ```text
//!   open ──► Handshake::on_event(Open) ──► perform actions
//!             │
//!             ▼
//!   ┌──── select! ─────────────────────────────────────┐
//!   │ frame       → on_event(Message) → perform        │
//!   │ idle tick   → on_idle_tick      → perform        │  (only while idle)
//!   │ shutdown    → close                              │
//!   │ close/error → end                                │
//!   └──────────────────────────────────────────────────┘
//!             │
//!             ▼
//!   Handshake::on_event(Close)
//! ```
//!
//! Actions run strictly in order; a `Pause` delays both sending and
//! reading, which keeps the two-message bursts together.

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, Instant};

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval, sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};

use crate::client::Timings;
use crate::error::{Error, Result};
use crate::session::{Action, Handshake, TransportEvent};

// ============================================================================
// Constants
// ============================================================================

/// Budget for the closing handshake before the socket is dropped.
const CLOSE_GRACE: Duration = Duration::from_millis(100);

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of [`WsStream`].
type WsWrite = SplitSink<WsStream, Message>;

/// How an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The connection could not be opened.
    Failed,
    /// An open connection ended.
    Closed,
    /// Shutdown was signalled.
    Shutdown,
}

/// One wake-up of the event loop.
enum Input {
    Frame(String),
    Tick,
    End(Termination),
    Nothing,
}

// ============================================================================
// Attempt
// ============================================================================

/// Runs one connection attempt against `uri`.
pub async fn run_attempt(
    uri: &str,
    machine: &mut Handshake,
    timings: &Timings,
    shutdown: &mut watch::Receiver<bool>,
) -> Termination {
    let opened = tokio::select! {
        result = open(uri, timings.connect_timeout) => result,
        () = wait_shutdown(shutdown) => return Termination::Shutdown,
    };
    let ws_stream = match opened {
        Ok(ws_stream) => ws_stream,
        Err(e) if e.is_timeout() => {
            warn!(uri, error = %e, "Daemon did not complete the WebSocket handshake");
            machine.on_event(TransportEvent::Fail);
            return Termination::Failed;
        }
        Err(e) => {
            debug!(uri, error = %e, "Could not open connection");
            machine.on_event(TransportEvent::Fail);
            return Termination::Failed;
        }
    };

    let (mut ws_write, mut ws_read) = ws_stream.split();
    let mut idle_tick = interval(timings.idle_poll);
    idle_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let actions = machine.on_event(TransportEvent::Open { uri });
    let mut end = perform(actions, &mut ws_write, shutdown).await;

    while end.is_none() {
        let input = tokio::select! {
            message = ws_read.next() => match message {
                Some(Ok(Message::Text(text))) => Input::Frame(text.as_str().to_string()),
                Some(Ok(Message::Binary(data))) => {
                    Input::Frame(String::from_utf8_lossy(&data).into_owned())
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "WebSocket closed by daemon");
                    Input::End(Termination::Closed)
                }
                Some(Err(e)) => {
                    warn!(uri, error = %e, "WebSocket error");
                    Input::End(Termination::Closed)
                }
                None => {
                    debug!("WebSocket stream ended");
                    Input::End(Termination::Closed)
                }
                // Ping, Pong, raw frames
                Some(Ok(_)) => Input::Nothing,
            },

            _ = idle_tick.tick(), if machine.is_idle() => Input::Tick,

            () = wait_shutdown(shutdown) => Input::End(Termination::Shutdown),
        };

        end = match input {
            Input::Frame(text) => {
                trace!(len = text.len(), "Frame received");
                let actions = machine.on_event(TransportEvent::Message(&text));
                perform(actions, &mut ws_write, shutdown).await
            }
            Input::Tick => {
                let actions = machine.on_idle_tick(Instant::now());
                perform(actions, &mut ws_write, shutdown).await
            }
            Input::End(termination) => Some(termination),
            Input::Nothing => None,
        };
    }

    let _ = timeout(CLOSE_GRACE, ws_write.close()).await;
    machine.on_event(TransportEvent::Close);
    end.unwrap_or(Termination::Closed)
}

/// Opens a WebSocket within `budget`.
async fn open(uri: &str, budget: Duration) -> Result<WsStream> {
    let (ws_stream, _response) = timeout(budget, connect_async(uri))
        .await
        .map_err(|_| Error::connection_timeout(budget.as_millis() as u64))??;
    Ok(ws_stream)
}

/// Runs handshake actions in order.
///
/// Returns `Some` if the connection ended or shutdown was signalled.
async fn perform(
    actions: Vec<Action>,
    ws_write: &mut WsWrite,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<Termination> {
    for action in actions {
        match action {
            Action::Send(request) => {
                let json = match request.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, opcode = request.opcode.as_str(), "Failed to encode request");
                        continue;
                    }
                };
                trace!(opcode = request.opcode.as_str(), "Sending");
                if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                    warn!(error = %e, "Failed to send request");
                    return Some(Termination::Closed);
                }
            }
            Action::Pause(delay) => {
                tokio::select! {
                    () = sleep(delay) => {}
                    () = wait_shutdown(shutdown) => return Some(Termination::Shutdown),
                }
            }
        }
    }
    None
}

/// Resolves once shutdown is signalled or the signalling side is gone.
pub async fn wait_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

// ============================================================================
// Tests
// ============================================================================
