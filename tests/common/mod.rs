//! Shared test helpers: an in-process fake daemon.
//!
//! The fake daemon binds `127.0.0.1:0` on its own thread and runtime, so
//! the blocking client API can be exercised from plain `#[test]` functions.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Configuration
// ============================================================================

/// Behaviour of the fake daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// `AppVersion` reply.
    pub version: String,
    /// `DeviceList` reply.
    pub devices: Vec<String>,
    /// `Info` reply.
    pub info: Vec<String>,
    /// Answer the `Info` that follows a `Reset`.
    pub answer_reset: bool,
    /// Close the connection on `Reset`.
    pub drop_on_reset: bool,
    /// Send a stale `USBA` payload before the first `Info` reply.
    pub spurious_before_info: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            version: "1.9.0-usb2snes".into(),
            devices: vec!["SD2SNES COM3".into()],
            info: vec![
                "1.10.3".into(),
                "SD2SNES".into(),
                "FEAT_DSPX".into(),
                "NO_ROM_WRITE".into(),
            ],
            answer_reset: true,
            drop_on_reset: false,
            spurious_before_info: false,
        }
    }
}

// ============================================================================
// FakeDaemon
// ============================================================================

/// A WebSocket server speaking just enough of the daemon protocol.
pub struct FakeDaemon {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<Value>>>,
    connections: Arc<AtomicUsize>,
    kick: watch::Sender<u64>,
    stop: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl FakeDaemon {
    /// Starts a daemon on a random port.
    pub fn spawn(config: DaemonConfig) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let (kick, kick_rx) = watch::channel(0u64);
        let (stop, stop_rx) = oneshot::channel();
        let (addr_tx, addr_rx) = std::sync::mpsc::channel();

        let thread = {
            let received = Arc::clone(&received);
            let connections = Arc::clone(&connections);
            thread::spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("runtime");
                runtime.block_on(async move {
                    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
                    addr_tx.send(listener.local_addr().expect("addr")).expect("addr channel");
                    accept_loop(listener, config, received, connections, kick_rx, stop_rx).await;
                });
            })
        };

        let addr = addr_rx.recv().expect("daemon address");
        Self {
            addr,
            received,
            connections,
            kick,
            stop: Some(stop),
            thread: Some(thread),
        }
    }

    /// WebSocket URI of this daemon.
    pub fn uri(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Every request received so far.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    /// Opcodes of every request received so far.
    pub fn opcodes(&self) -> Vec<String> {
        self.received()
            .iter()
            .filter_map(|r| r["Opcode"].as_str().map(str::to_string))
            .collect()
    }

    /// Number of requests with `opcode`.
    pub fn count(&self, opcode: &str) -> usize {
        self.opcodes().iter().filter(|o| *o == opcode).count()
    }

    /// Number of accepted WebSocket connections.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Closes every open connection; the listener keeps accepting.
    pub fn kick(&self) {
        self.kick.send_modify(|generation| *generation += 1);
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    config: DaemonConfig,
    received: Arc<Mutex<Vec<Value>>>,
    connections: Arc<AtomicUsize>,
    kick: watch::Receiver<u64>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let Ok((stream, _)) = accepted else { continue };
                connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(
                    stream,
                    config.clone(),
                    Arc::clone(&received),
                    kick.clone(),
                ));
            }
            _ = &mut stop => break,
        }
    }
}

async fn serve(
    stream: TcpStream,
    config: DaemonConfig,
    received: Arc<Mutex<Vec<Value>>>,
    mut kick: watch::Receiver<u64>,
) {
    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut write, mut read) = ws.split();
    kick.mark_unchanged();

    let mut after_reset = false;
    let mut spurious_sent = false;

    loop {
        let text = tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => text.as_str().to_string(),
                Some(Ok(_)) => continue,
                _ => break,
            },
            _ = kick.changed() => {
                let _ = write.close().await;
                break;
            }
        };

        let Ok(request) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        received.lock().push(request.clone());

        let reply = match request["Opcode"].as_str().unwrap_or_default() {
            "AppVersion" => Some(json!({ "Results": [config.version] })),
            "DeviceList" => Some(json!({ "Results": config.devices })),
            "Reset" => {
                if config.drop_on_reset {
                    let _ = write.close().await;
                    break;
                }
                after_reset = true;
                None
            }
            "Info" => {
                let answer = !after_reset || config.answer_reset;
                after_reset = false;
                if config.spurious_before_info && !spurious_sent {
                    spurious_sent = true;
                    let _ = write
                        .send(Message::Binary(b"USBA\x00\x00\x00\x10".to_vec().into()))
                        .await;
                }
                answer.then(|| json!({ "Results": config.info }))
            }
            _ => None,
        };

        if let Some(reply) = reply
            && write.send(Message::Text(reply.to_string().into())).await.is_err()
        {
            break;
        }
    }
}

// ============================================================================
// Polling helpers
// ============================================================================

/// Default budget for [`wait_until`].
pub const WAIT_BUDGET: Duration = Duration::from_secs(5);

/// Polls `condition` until it holds or `WAIT_BUDGET` elapses.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_BUDGET;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Returns a `ws://` URI on which nothing listens.
pub fn dead_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("ws://{addr}")
}

/// Installs a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
