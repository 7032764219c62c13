//! Protocol handshake state machine.
//!
//! The daemon protocol is strictly sequential: one request awaits a reply at
//! a time and replies carry no id. [`Handshake`] remembers which exchange is
//! pending ([`Op`]), interprets each inbound frame in that context and
//! returns the [`Action`]s the transport must perform next.
//!
//! # Transitions
//!
//! | Pending | Event | Next pending | Actions |
//! |---------|-------|--------------|---------|
//! | any | open | `GetVersion` | `Name`, `AppVersion` |
//! | `GetVersion` | reply | `Scan` | pause, `DeviceList` |
//! | `Scan` | non-empty reply | `Connect` | `Attach`, `Info`, pause |
//! | `Scan` | empty reply | `Scan` | pause, `DeviceList` |
//! | `Connect` | `USBA...` | `Connect` | none |
//! | `Connect` | backend info | `None` (idle) | none |
//! | `Connect` | bad reply | `Scan` | pause, `DeviceList` |
//! | `Reset` | reply | `None` (idle) | none, reset acknowledged unless abandoned |
//! | `Ping` | reply | `None` (idle) | none |
//! | `None` | reply | `None` | none, logged |
//! | `None` (idle) | reset requested | `Reset` | `Reset`, `Info` |
//! | `None` (idle) | heartbeat due | `Ping` | `Info` |
//! | any | fail / close | `None` | none, state cleared |
//!
//! Whenever a reply leaves the device detached the machine rescans; when a
//! device is attached it goes idle and waits for [`Handshake::on_idle_tick`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::client::Timings;
use crate::error::{Error, Result};
use crate::identifiers::AppId;
use crate::protocol::{Opcode, Request, Response};
use crate::version::Version;

use super::state::{DEFAULT_BACKEND, Shared, is_feature_flag};

// ============================================================================
// Constants
// ============================================================================

/// URI suffix of the well-known enhanced-daemon (QUsb2Snes) endpoint.
///
/// Heuristic: the protocol does not identify the daemon implementation, so
/// the default port is the only signal. Proxies or custom ports defeat it.
pub const ENHANCED_PORT_SUFFIX: &str = ":23074/";

/// Prefix of the enhanced daemon's `AppVersion` reply.
pub const ENHANCED_VERSION_PREFIX: &str = "QUsb2Snes-";

/// Leading bytes of a stale binary payload the daemon sometimes leaks in
/// front of the `Info` reply.
pub const SPURIOUS_PREFIX: &[u8] = b"USBA";

// ============================================================================
// Types
// ============================================================================

/// The exchange currently awaiting a reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Op {
    /// Nothing pending.
    #[default]
    None,
    /// `AppVersion` sent.
    GetVersion,
    /// `DeviceList` sent.
    Scan,
    /// `Attach` + `Info` sent.
    Connect,
    /// `Reset` + `Info` sent.
    Reset,
    /// Heartbeat `Info` sent.
    Ping,
}

/// Transport lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent<'a> {
    /// Connection to `uri` is open.
    Open {
        /// URI the transport connected to.
        uri: &'a str,
    },
    /// Inbound frame payload.
    Message(&'a str),
    /// Connection could not be opened.
    Fail,
    /// Open connection ended.
    Close,
}

/// Something the transport must do on behalf of the machine, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Send a frame.
    Send(Request),
    /// Sleep before handling anything else.
    Pause(Duration),
}

/// Outcome of interpreting one reply.
enum Reply {
    /// Reply consumed; rescan or go idle.
    Handled,
    /// Keep the current exchange pending.
    Wait,
    /// Next exchange already started.
    Started(Vec<Action>),
}

/// Backend details from an `Info` reply.
struct Backend {
    name: String,
    version: Version,
    features: FxHashSet<String>,
}

// ============================================================================
// Handshake
// ============================================================================

/// Handshake state machine for one client.
///
/// Owned by the worker task; writes [`Shared`] state, never blocks.
#[derive(Debug)]
pub struct Handshake {
    shared: Arc<Shared>,
    session_name: String,
    timings: Timings,
    pending: Op,
    device_index: usize,
    enhanced: bool,
    idle_since: Option<Instant>,
}

impl Handshake {
    /// Creates a machine for `app_name` / `app_id`.
    #[must_use]
    pub fn new(shared: Arc<Shared>, app_name: &str, app_id: AppId, timings: Timings) -> Self {
        Self {
            shared,
            session_name: app_id.session_name(app_name),
            timings,
            pending: Op::None,
            device_index: 0,
            enhanced: false,
            idle_since: None,
        }
    }

    /// Returns the pending exchange.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> Op {
        self.pending
    }

    /// Returns the index of the device the next scan will attach to.
    #[inline]
    #[must_use]
    pub fn device_index(&self) -> usize {
        self.device_index
    }

    /// Returns `true` while attached and waiting for a reset request.
    #[inline]
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.idle_since.is_some()
    }

    /// Returns `true` if the open connection is the enhanced daemon's.
    #[inline]
    #[must_use]
    pub fn is_enhanced(&self) -> bool {
        self.enhanced
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Handles one transport event.
    pub fn on_event(&mut self, event: TransportEvent<'_>) -> Vec<Action> {
        match event {
            TransportEvent::Open { uri } => self.on_open(uri),
            TransportEvent::Message(text) => self.on_message(text),
            TransportEvent::Fail | TransportEvent::Close => {
                self.on_terminated(event);
                Vec::new()
            }
        }
    }

    /// Checks the idle triggers. Call periodically while [`is_idle`](Self::is_idle).
    pub fn on_idle_tick(&mut self, now: Instant) -> Vec<Action> {
        let Some(idle_since) = self.idle_since else {
            return Vec::new();
        };

        if self.shared.take_reset_request() {
            debug!("Sending reset");
            self.idle_since = None;
            self.pending = Op::Reset;
            // No reply to Reset; the Info reply confirms it.
            return vec![
                Action::Send(Request::new(Opcode::Reset)),
                Action::Send(Request::new(Opcode::Info)),
            ];
        }

        if let Some(interval) = self.timings.heartbeat
            && now.saturating_duration_since(idle_since) >= interval
        {
            trace!("Heartbeat");
            self.idle_since = None;
            self.pending = Op::Ping;
            return vec![Action::Send(Request::new(Opcode::Info))];
        }

        Vec::new()
    }

    fn on_open(&mut self, uri: &str) -> Vec<Action> {
        self.enhanced = is_enhanced_uri(uri);
        self.shared.update(|state| {
            state.ws_connected = true;
            state.device_connected = false;
            state.state_changed = true;
        });
        info!(uri, "Connection opened");

        self.idle_since = None;
        self.pending = Op::GetVersion;
        vec![
            Action::Send(Request::name(self.session_name.clone())),
            Action::Send(Request::new(Opcode::AppVersion)),
        ]
    }

    fn on_message(&mut self, text: &str) -> Vec<Action> {
        let reply = match self.pending {
            Op::GetVersion => self.on_version_reply(text),
            Op::Scan => self.on_scan_reply(text),
            Op::Connect => self.on_attach_reply(text),
            Op::Reset => {
                if !self.shared.acknowledge_reset() {
                    debug!("Dropping confirmation of an abandoned reset");
                }
                Reply::Handled
            }
            Op::Ping => Reply::Handled,
            Op::None => {
                debug!(text, "Unhandled message");
                Reply::Wait
            }
        };

        match reply {
            Reply::Handled => self.follow_up(),
            Reply::Wait => Vec::new(),
            Reply::Started(actions) => actions,
        }
    }

    fn on_terminated(&mut self, event: TransportEvent<'_>) {
        self.shared.update(|state| {
            let changed = state.ws_connected || state.device_connected;
            state.ws_connected = false;
            state.device_connected = false;
            state.clear_identity();
            if changed {
                state.state_changed = true;
            }
        });
        if event == TransportEvent::Close {
            info!("Connection closed");
        } else {
            debug!("Connection failed");
        }

        self.pending = Op::None;
        self.idle_since = None;
    }

    /// Rescans while detached, goes idle once attached.
    fn follow_up(&mut self) -> Vec<Action> {
        if self.shared.device_connected() {
            self.pending = Op::None;
            self.idle_since = Some(Instant::now());
            return Vec::new();
        }

        self.pending = Op::Scan;
        vec![
            Action::Pause(self.timings.scan_throttle),
            Action::Send(Request::new(Opcode::DeviceList)),
        ]
    }

    // ------------------------------------------------------------------------
    // Replies
    // ------------------------------------------------------------------------

    fn on_version_reply(&mut self, text: &str) -> Reply {
        let response = match Response::parse(text) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Malformed version reply");
                return Reply::Handled;
            }
        };
        let Some(raw) = response.get_str(0) else {
            return Reply::Handled;
        };

        let stripped = raw.strip_prefix(ENHANCED_VERSION_PREFIX);
        let version = Version::parse(stripped.unwrap_or(raw));
        let flavor = stripped.filter(|_| self.enhanced).map(Version::parse);
        match &flavor {
            Some(version) => info!(%version, "QUsb2Snes version"),
            None => info!(version = raw, "Usb2Snes version"),
        }

        self.shared.update(|state| {
            state.daemon_version_string = raw.to_string();
            state.daemon_version = version;
            state.daemon_flavor_version = flavor;
        });
        Reply::Handled
    }

    fn on_scan_reply(&mut self, text: &str) -> Reply {
        let response = match Response::parse(text) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Malformed device list");
                return Reply::Handled;
            }
        };
        if response.is_empty() {
            return Reply::Handled;
        }
        let devices = response.results();

        debug!(count = devices.len(), ?devices, "Scan results");
        if self.device_index >= devices.len() {
            self.device_index = 0;
        }
        let device = devices[self.device_index].clone();
        info!(%device, "Attaching");

        self.pending = Op::Connect;
        Reply::Started(vec![
            Action::Send(Request::attach(device)),
            Action::Send(Request::new(Opcode::Info)),
            Action::Pause(self.timings.attach_settle),
        ])
    }

    fn on_attach_reply(&mut self, text: &str) -> Reply {
        if text.as_bytes().starts_with(SPURIOUS_PREFIX) {
            warn!("Received invalid response. Ignoring");
            return Reply::Wait;
        }

        let backend = Response::parse(text).and_then(|r| parse_backend(&r));
        match backend {
            Ok(backend) => {
                info!(
                    backend = %backend.name,
                    version = %backend.version,
                    "Device connected"
                );
                self.shared.update(|state| {
                    state.device_connected = true;
                    state.state_changed = true;
                    state.backend_name = backend.name;
                    state.backend_version = backend.version;
                    state.features = backend.features;
                });
            }
            Err(e) => {
                debug!(
                    error = %e,
                    index = self.device_index,
                    "Attach failed, trying next device"
                );
                self.device_index += 1;
                self.shared.update(|state| state.clear_backend());
            }
        }
        Reply::Handled
    }
}

/// Extracts backend details from an `Info` reply.
fn parse_backend(response: &Response) -> Result<Backend> {
    let results = response.results();
    let version = results
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| Error::protocol("Info reply carries no backend version"))?;
    let name = match results.get(1) {
        Some(value) => value
            .as_str()
            .ok_or_else(|| Error::protocol("Backend name is not a string"))?,
        None => DEFAULT_BACKEND,
    };
    let features = response
        .strings()
        .filter(|s| is_feature_flag(s))
        .map(str::to_string)
        .collect();

    Ok(Backend {
        name: name.to_string(),
        version: Version::parse(version),
        features,
    })
}

/// Returns `true` if `uri` points at the enhanced daemon's default port.
fn is_enhanced_uri(uri: &str) -> bool {
    match Url::parse(uri) {
        Ok(url) => url.as_str().ends_with(ENHANCED_PORT_SUFFIX),
        Err(_) => uri.ends_with(ENHANCED_PORT_SUFFIX),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    const ENHANCED_URI: &str = "ws://localhost:23074";
    const LEGACY_URI: &str = "ws://localhost:8080";

    fn machine() -> (Handshake, Arc<Shared>) {
        let shared = Arc::new(Shared::new());
        let machine = Handshake::new(
            Arc::clone(&shared),
            "Test",
            AppId::generate(),
            Timings::default(),
        );
        (machine, shared)
    }

    fn opcodes(actions: &[Action]) -> Vec<Opcode> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Send(r) => Some(r.opcode),
                Action::Pause(_) => None,
            })
            .collect()
    }

    fn results(values: serde_json::Value) -> String {
        json!({ "Results": values }).to_string()
    }

    /// Drives a machine up to the pending attach reply.
    fn attach_pending(devices: serde_json::Value) -> (Handshake, Arc<Shared>) {
        let (mut m, shared) = machine();
        m.on_event(TransportEvent::Open { uri: LEGACY_URI });
        m.on_event(TransportEvent::Message(&results(json!(["1.9.0-usb2snes"]))));
        m.on_event(TransportEvent::Message(&results(devices)));
        assert_eq!(m.pending(), Op::Connect);
        (m, shared)
    }

    fn attached() -> (Handshake, Arc<Shared>) {
        let (mut m, shared) = attach_pending(json!(["SD2SNES COM3"]));
        m.on_event(TransportEvent::Message(&results(json!(["1.10.3", "SD2SNES"]))));
        assert!(m.is_idle());
        (m, shared)
    }

    #[test]
    fn test_open_names_session_then_asks_version() {
        let (mut m, shared) = machine();
        let actions = m.on_event(TransportEvent::Open { uri: LEGACY_URI });

        assert_eq!(opcodes(&actions), vec![Opcode::Name, Opcode::AppVersion]);
        let Action::Send(name) = &actions[0] else {
            panic!("expected Name request");
        };
        let operand = name.operands.as_ref().unwrap()[0].as_str().unwrap();
        assert!(operand.starts_with("Test "));
        assert_eq!(operand.len(), "Test ".len() + 4);

        assert_eq!(m.pending(), Op::GetVersion);
        let state = shared.snapshot();
        assert!(state.ws_connected);
        assert!(!state.device_connected);
        assert!(state.state_changed);
    }

    #[test]
    fn test_version_reply_on_enhanced_endpoint() {
        let (mut m, shared) = machine();
        m.on_event(TransportEvent::Open { uri: ENHANCED_URI });
        assert!(m.is_enhanced());

        let actions = m.on_event(TransportEvent::Message(&results(json!(["QUsb2Snes-0.7.19"]))));

        assert_eq!(opcodes(&actions), vec![Opcode::DeviceList]);
        assert_eq!(actions[0], Action::Pause(Timings::default().scan_throttle));
        assert_eq!(m.pending(), Op::Scan);
        let state = shared.snapshot();
        assert_eq!(state.daemon_version_string, "QUsb2Snes-0.7.19");
        assert_eq!(state.daemon_flavor_version, Some(Version::new(0, 7, 19, "")));
    }

    #[test]
    fn test_version_prefix_ignored_on_legacy_endpoint() {
        let (mut m, shared) = machine();
        m.on_event(TransportEvent::Open { uri: LEGACY_URI });
        assert!(!m.is_enhanced());

        m.on_event(TransportEvent::Message(&results(json!(["QUsb2Snes-0.7.19"]))));

        let state = shared.snapshot();
        assert!(state.daemon_flavor_version.is_none());
        assert_eq!(state.daemon_version, Version::new(0, 7, 19, ""));
        assert_eq!(m.pending(), Op::Scan);
    }

    #[test]
    fn test_plain_version_reply_parsed_as_is() {
        let (mut m, shared) = machine();
        m.on_event(TransportEvent::Open { uri: ENHANCED_URI });
        m.on_event(TransportEvent::Message(&results(json!(["1.9.0-usb2snes"]))));

        let state = shared.snapshot();
        assert_eq!(state.daemon_version, Version::new(1, 9, 0, ""));
        assert_eq!(state.daemon_version.extra, "usb2snes");
        assert!(state.daemon_flavor_version.is_none());
    }

    #[test]
    fn test_malformed_version_reply_still_scans() {
        let (mut m, _) = machine();
        m.on_event(TransportEvent::Open { uri: LEGACY_URI });
        let actions = m.on_event(TransportEvent::Message("not json"));
        assert_eq!(opcodes(&actions), vec![Opcode::DeviceList]);
        assert_eq!(m.pending(), Op::Scan);
    }

    #[test]
    fn test_scan_reply_attaches_first_device() {
        let (mut m, _) = machine();
        m.on_event(TransportEvent::Open { uri: LEGACY_URI });
        m.on_event(TransportEvent::Message(&results(json!(["1.9.0"]))));

        let actions = m.on_event(TransportEvent::Message(&results(json!(["SD2SNES COM3", "EMU"]))));

        assert_eq!(opcodes(&actions), vec![Opcode::Attach, Opcode::Info]);
        assert_eq!(
            actions[0],
            Action::Send(Request::attach(json!("SD2SNES COM3")))
        );
        assert_eq!(
            actions.last(),
            Some(&Action::Pause(Timings::default().attach_settle))
        );
        assert_eq!(m.pending(), Op::Connect);
    }

    #[test]
    fn test_empty_scan_rescans() {
        let (mut m, shared) = machine();
        m.on_event(TransportEvent::Open { uri: LEGACY_URI });
        m.on_event(TransportEvent::Message(&results(json!(["1.9.0"]))));

        let actions = m.on_event(TransportEvent::Message(&results(json!([]))));

        assert_eq!(opcodes(&actions), vec![Opcode::DeviceList]);
        assert_eq!(m.pending(), Op::Scan);
        assert!(!shared.device_connected());
    }

    #[test]
    fn test_attach_reply_marks_device_connected() {
        let (mut m, shared) = attach_pending(json!(["SD2SNES COM3"]));
        shared.take_state_changed();

        let actions = m.on_event(TransportEvent::Message(&results(json!([
            "2.0.0", "SD2SNES", "FEAT_DSP1", "NO_DSP2"
        ]))));

        assert!(actions.is_empty());
        assert!(m.is_idle());
        assert_eq!(m.pending(), Op::None);
        let state = shared.snapshot();
        assert!(state.ws_connected);
        assert!(state.device_connected);
        assert!(state.state_changed);
        assert_eq!(state.backend_name, "SD2SNES");
        assert_eq!(state.backend_version, Version::new(2, 0, 0, ""));
        let expected: FxHashSet<String> =
            ["FEAT_DSP1", "NO_DSP2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(state.features, expected);
        assert!(state.has_feature("FEAT_DSP1"));
    }

    #[test]
    fn test_attach_reply_without_name_uses_default_backend() {
        let (mut m, shared) = attach_pending(json!(["SD2SNES COM3"]));
        m.on_event(TransportEvent::Message(&results(json!(["1.10.3"]))));
        let state = shared.snapshot();
        assert!(state.device_connected);
        assert_eq!(state.backend_name, DEFAULT_BACKEND);
    }

    #[test]
    fn test_empty_attach_reply_tries_next_device() {
        let (mut m, shared) = attach_pending(json!(["A", "B"]));

        let actions = m.on_event(TransportEvent::Message(&results(json!([]))));

        assert!(!shared.device_connected());
        assert_eq!(opcodes(&actions), vec![Opcode::DeviceList]);
        assert_eq!(m.pending(), Op::Scan);
        assert_eq!(m.device_index(), 1);

        let actions = m.on_event(TransportEvent::Message(&results(json!(["A", "B"]))));
        assert_eq!(actions[0], Action::Send(Request::attach(json!("B"))));
    }

    #[test]
    fn test_device_index_wraps_when_list_shrinks() {
        let (mut m, _) = attach_pending(json!(["A", "B"]));
        m.on_event(TransportEvent::Message(&results(json!([]))));
        assert_eq!(m.device_index(), 1);

        let actions = m.on_event(TransportEvent::Message(&results(json!(["A"]))));
        assert_eq!(actions[0], Action::Send(Request::attach(json!("A"))));
        assert_eq!(m.device_index(), 0);
    }

    #[test]
    fn test_malformed_attach_reply_tries_next_device() {
        let (mut m, shared) = attach_pending(json!(["A", "B"]));
        m.on_event(TransportEvent::Message(&results(json!([7, "SD2SNES"]))));
        assert!(!shared.device_connected());
        assert_eq!(m.device_index(), 1);

        let (mut m, _) = attach_pending(json!(["A", "B"]));
        m.on_event(TransportEvent::Message("{broken"));
        assert_eq!(m.device_index(), 1);
        assert_eq!(m.pending(), Op::Scan);
    }

    #[test]
    fn test_spurious_payload_is_ignored() {
        let (mut m, shared) = attach_pending(json!(["SD2SNES COM3"]));
        let before = shared.snapshot();

        let actions = m.on_event(TransportEvent::Message("USBA\u{0}\u{1}garbage"));

        assert!(actions.is_empty());
        assert_eq!(m.pending(), Op::Connect);
        assert_eq!(m.device_index(), 0);
        let after = shared.snapshot();
        assert_eq!(after.device_connected, before.device_connected);
        assert_eq!(after.features, before.features);

        m.on_event(TransportEvent::Message(&results(json!(["1.10.3", "SD2SNES"]))));
        assert!(shared.device_connected());
    }

    #[test]
    fn test_idle_tick_without_request_does_nothing() {
        let (mut m, _) = attached();
        assert!(m.on_idle_tick(Instant::now()).is_empty());
        assert!(m.is_idle());
    }

    #[test]
    fn test_reset_request_sends_reset_and_info() {
        let (mut m, shared) = attached();
        shared.request_reset();

        let actions = m.on_idle_tick(Instant::now());

        assert_eq!(opcodes(&actions), vec![Opcode::Reset, Opcode::Info]);
        assert_eq!(m.pending(), Op::Reset);
        assert!(!m.is_idle());
        assert!(!shared.reset_request().want);

        let actions = m.on_event(TransportEvent::Message(&results(json!(["1.10.3", "SD2SNES"]))));
        assert!(actions.is_empty());
        assert!(shared.take_reset_ack());
        assert!(m.is_idle());
    }

    #[test]
    fn test_late_reply_to_abandoned_reset_is_not_a_confirmation() {
        let (mut m, shared) = attached();
        shared.request_reset();
        m.on_idle_tick(Instant::now());
        assert_eq!(m.pending(), Op::Reset);

        // The caller gives up, then asks again before the daemon answers.
        shared.cancel_reset();
        shared.request_reset();
        m.on_event(TransportEvent::Message(&results(json!(["1.10.3", "SD2SNES"]))));

        assert!(!shared.take_reset_ack());
        assert!(shared.reset_request().want);
        assert!(m.is_idle());

        let actions = m.on_idle_tick(Instant::now());
        assert_eq!(opcodes(&actions), vec![Opcode::Reset, Opcode::Info]);
        m.on_event(TransportEvent::Message(&results(json!(["1.10.3", "SD2SNES"]))));
        assert!(shared.take_reset_ack());
    }

    #[test]
    fn test_message_while_idle_is_only_logged() {
        let (mut m, shared) = attached();
        let actions = m.on_event(TransportEvent::Message(&results(json!(["stray"]))));
        assert!(actions.is_empty());
        assert!(shared.device_connected());
        assert!(!shared.take_reset_ack());
    }

    #[test]
    fn test_heartbeat_uses_ping_slot() {
        let shared = Arc::new(Shared::new());
        let timings = Timings::default().with_heartbeat(Duration::ZERO);
        let mut m = Handshake::new(Arc::clone(&shared), "Test", AppId::generate(), timings);
        m.on_event(TransportEvent::Open { uri: LEGACY_URI });
        m.on_event(TransportEvent::Message(&results(json!(["1.9.0"]))));
        m.on_event(TransportEvent::Message(&results(json!(["A"]))));
        m.on_event(TransportEvent::Message(&results(json!(["1.10.3"]))));
        assert!(m.is_idle());

        let actions = m.on_idle_tick(Instant::now());
        assert_eq!(opcodes(&actions), vec![Opcode::Info]);
        assert_eq!(m.pending(), Op::Ping);

        let actions = m.on_event(TransportEvent::Message(&results(json!(["1.10.3"]))));
        assert!(actions.is_empty());
        assert!(m.is_idle());
        assert!(!shared.take_reset_ack());
    }

    #[test]
    fn test_close_clears_state_from_any_op() {
        for stage in 0..3 {
            let (mut m, shared) = attached();
            if stage == 1 {
                shared.request_reset();
                m.on_idle_tick(Instant::now());
            } else if stage == 2 {
                m.on_event(TransportEvent::Open { uri: ENHANCED_URI });
                m.on_event(TransportEvent::Message(&results(json!(["QUsb2Snes-0.7.19"]))));
            }
            shared.take_state_changed();

            m.on_event(TransportEvent::Close);

            let state = shared.snapshot();
            assert!(!state.ws_connected);
            assert!(!state.device_connected);
            assert!(state.state_changed);
            assert!(state.backend_name.is_empty());
            assert!(state.backend_version.is_empty());
            assert!(state.features.is_empty());
            assert!(state.daemon_version_string.is_empty());
            assert!(state.daemon_flavor_version.is_none());
            assert_eq!(m.pending(), Op::None);
            assert!(!m.is_idle());
        }
    }

    #[test]
    fn test_fail_without_connection_does_not_raise_change() {
        let (mut m, shared) = machine();
        m.on_event(TransportEvent::Fail);
        assert!(!shared.take_state_changed());
        assert!(!shared.ws_connected());
    }

    #[test]
    fn test_parse_backend_rejects_reply_without_version() {
        let empty = Response::parse(&results(json!([]))).unwrap();
        assert!(matches!(parse_backend(&empty), Err(Error::Protocol { .. })));

        let bad_name = Response::parse(&results(json!(["1.10.3", 7]))).unwrap();
        assert!(matches!(parse_backend(&bad_name), Err(Error::Protocol { .. })));
    }

    #[test]
    fn test_enhanced_uri_detection() {
        assert!(is_enhanced_uri("ws://localhost:23074"));
        assert!(is_enhanced_uri("ws://localhost:23074/"));
        assert!(is_enhanced_uri("ws://127.0.0.1:23074"));
        assert!(!is_enhanced_uri("ws://localhost:8080"));
        assert!(!is_enhanced_uri("ws://localhost:23074/path"));
    }
}
