//! The connection engine.
//!
//! Sans-io and single-threaded: the external event loop hands received bytes
//! to [`Engine::feed`] and drains [`Connection::take_outbound`] when the
//! socket is writable. Each connection starts unversioned; its first frame
//! must be a version announcement, after which the negotiated version picks
//! the payload codec (binary below version 2, JSON from version 2 on) and
//! whether correlation tags exist on the wire.
//!
//! Any framing or decode error on inbound bytes is fatal to that connection:
//! the engine closes it, fails its pending requests, and surfaces the error
//! to the caller. There is no per-message recovery.

use std::collections::HashMap;

use bytes::{Buf, BytesMut};
use riptide_variant::Variant;
use tracing::{debug, warn};

use crate::error::ProtoError;
use crate::frame;
use crate::registry::{self, MsgId, MSG_COUNT};
use crate::{PROTO_VERSION_MAX, PROTO_VERSION_MIN};

/// A message handler. The connection is passed read-only so handlers can
/// observe the negotiated version; returning a [`Reply`] makes the engine
/// encode, frame, and queue it on that same connection.
pub type Handler =
    Box<dyn for<'a> FnMut(&Connection, MsgId, &'a Variant<'a>, i64) -> Option<Reply>>;

/// Invoked exactly once: with the response payload, or with
/// [`ProtoError::ConnectionClosed`] if the connection dies first.
pub type Waiter = Box<dyn FnOnce(Result<Variant<'static>, ProtoError>)>;

/// A synchronous response produced by a handler.
pub struct Reply {
    pub name: &'static str,
    pub payload: Variant<'static>,
    pub tag: i64,
}

/// At most one handler per message id, plus an optional default that
/// receives anything unrecognized or unhandled as [`MsgId::Unknown`].
/// Built once at startup and injected into the engine.
#[derive(Default)]
pub struct HandlerTable {
    specific: Vec<Option<Handler>>,
    default: Option<Handler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        HandlerTable {
            specific: (0..MSG_COUNT).map(|_| None).collect(),
            default: None,
        }
    }

    /// Registers the handler for `id`. Each id accepts one registration.
    pub fn register(&mut self, id: MsgId, handler: Handler) -> Result<(), ProtoError> {
        let idx = id.index().ok_or(ProtoError::InvalidHandlerId(id))?;
        let slot = &mut self.specific[idx];
        if slot.is_some() {
            return Err(ProtoError::HandlerAlreadyRegistered(id));
        }
        *slot = Some(handler);
        Ok(())
    }

    pub fn set_default(&mut self, handler: Handler) {
        self.default = Some(handler);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// No handshake yet; the only acceptable inbound frame is a version
    /// announcement.
    Unversioned,
    /// Handshake done; the version is fixed for the connection's lifetime.
    Versioned(u32),
    Closed,
}

/// Per-connection state: input accumulator, outbound buffer, negotiated
/// version, and the initiator-side pending-request table. Owned by a single
/// event-processing context; nothing here is shared or locked.
pub struct Connection {
    state: ConnState,
    inbuf: BytesMut,
    outbuf: BytesMut,
    pending: HashMap<i64, Waiter>,
    last_tag: i64,
}

impl Connection {
    pub fn new() -> Self {
        Connection {
            state: ConnState::Unversioned,
            inbuf: BytesMut::new(),
            outbuf: BytesMut::new(),
            pending: HashMap::new(),
            last_tag: 0,
        }
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn negotiated_version(&self) -> Option<u32> {
        match self.state {
            ConnState::Versioned(v) => Some(v),
            _ => None,
        }
    }

    /// Bytes queued for the socket; the caller writes these out.
    pub fn take_outbound(&mut self) -> BytesMut {
        self.outbuf.split()
    }

    /// A fresh positive correlation tag.
    pub fn next_tag(&mut self) -> i64 {
        self.last_tag += 1;
        self.last_tag
    }

    fn version(&self) -> Result<u32, ProtoError> {
        match self.state {
            ConnState::Versioned(v) => Ok(v),
            ConnState::Unversioned => Err(ProtoError::NotVersioned),
            ConnState::Closed => Err(ProtoError::ConnectionClosed),
        }
    }
}

impl Default for Connection {
    fn default() -> Self {
        Connection::new()
    }
}

pub struct Engine {
    handlers: HandlerTable,
}

impl Engine {
    pub fn new(handlers: HandlerTable) -> Self {
        Engine { handlers }
    }

    /// Appends `bytes` to the connection's input accumulator and processes
    /// every complete frame in it, returning how many accumulated bytes
    /// were consumed. A trailing partial frame stays buffered for the next
    /// call. On error the connection is closed before returning.
    pub fn feed(&mut self, conn: &mut Connection, bytes: &[u8]) -> Result<usize, ProtoError> {
        if conn.state == ConnState::Closed {
            return Err(ProtoError::ConnectionClosed);
        }
        conn.inbuf.extend_from_slice(bytes);
        match self.run_frames(conn) {
            Ok(consumed) => Ok(consumed),
            Err(err) => {
                warn!(error = %err, "closing connection on protocol error");
                self.close(conn);
                Err(err)
            }
        }
    }

    fn run_frames(&mut self, conn: &mut Connection) -> Result<usize, ProtoError> {
        let mut consumed = 0usize;
        loop {
            let state = conn.state;
            // Decode to an owned tree before the frame bytes are released.
            let (tree, used) = {
                let Some((payload, used)) = frame::split_frame(&conn.inbuf)? else {
                    break;
                };
                let tree = match state {
                    ConnState::Unversioned => riptide_benc::decode(payload)?,
                    ConnState::Versioned(v) if v < 2 => riptide_benc::decode(payload)?,
                    ConnState::Versioned(_) => riptide_json::decode(payload)?,
                    ConnState::Closed => return Err(ProtoError::ConnectionClosed),
                };
                (tree, used)
            };
            conn.inbuf.advance(used);
            consumed += used;

            match state {
                ConnState::Unversioned => self.handshake(conn, &tree)?,
                ConnState::Versioned(v) => self.dispatch(conn, v, tree)?,
                ConnState::Closed => return Err(ProtoError::ConnectionClosed),
            }
        }
        Ok(consumed)
    }

    /// First inbound frame: `{"version": v}` with `v` either a bare integer
    /// (min = max) or a `{min, max}` dict.
    fn handshake(&self, conn: &mut Connection, tree: &Variant<'_>) -> Result<(), ProtoError> {
        let announce = tree.get("version").ok_or(ProtoError::BadHandshake)?;

        let (min, max) = match announce {
            Variant::Int(v) => (*v, *v),
            Variant::Dict(_) => (
                announce.get_int("min").unwrap_or(-1),
                announce.get_int("max").unwrap_or(-1),
            ),
            _ => (-1, -1),
        };

        if min <= 0 || max <= 0 || min > max || max > i64::from(u32::MAX) {
            return Err(ProtoError::BadHandshake);
        }

        let negotiated = i64::from(PROTO_VERSION_MAX).min(max);
        if negotiated < i64::from(PROTO_VERSION_MIN).max(min) {
            return Err(ProtoError::UnsupportedVersion { min, max });
        }

        conn.state = ConnState::Versioned(negotiated as u32);
        debug!(version = negotiated, "protocol version agreed");
        Ok(())
    }

    /// Below version 2 a payload is `[name, payload, tag?]`; from version 2
    /// on it is a single-entry `{name: payload}` and carries no tag.
    fn dispatch(
        &mut self,
        conn: &mut Connection,
        version: u32,
        mut tree: Variant<'static>,
    ) -> Result<(), ProtoError> {
        if version < 2 {
            let items = tree
                .as_list_mut()
                .map_err(|_| ProtoError::MalformedMessage)?;
            if items.len() < 2 || items.len() > 3 {
                return Err(ProtoError::MalformedMessage);
            }
            let tag = match items.get(2) {
                Some(t) => t.as_int().map_err(|_| ProtoError::MalformedMessage)?,
                None => -1,
            };
            let payload = items.remove(1);
            let name = items[0]
                .as_bytes()
                .map_err(|_| ProtoError::MalformedMessage)?
                .to_vec();
            self.dispatch_one(conn, version, &name, payload, tag)
        } else {
            let entries = tree
                .as_dict_mut()
                .map_err(|_| ProtoError::MalformedMessage)?;
            if entries.len() != 1 {
                return Err(ProtoError::MalformedMessage);
            }
            let (name, payload) = entries.remove(0);
            self.dispatch_one(conn, version, name.as_bytes(), payload, -1)
        }
    }

    fn dispatch_one(
        &mut self,
        conn: &mut Connection,
        version: u32,
        name: &[u8],
        payload: Variant<'static>,
        tag: i64,
    ) -> Result<(), ProtoError> {
        // Response correlation wins over dispatch; a tag nobody is waiting
        // for falls through to the handlers.
        if tag > 0 {
            if let Some(waiter) = conn.pending.remove(&tag) {
                waiter(Ok(payload));
                return Ok(());
            }
        }

        let reply = match registry::lookup(name) {
            Some(spec) if spec.min_version <= version => {
                let idx = spec
                    .id
                    .index()
                    .ok_or(ProtoError::InvalidHandlerId(spec.id))?;
                match &mut self.handlers.specific[idx] {
                    Some(handler) => handler(conn, spec.id, &payload, tag),
                    None => self.fallback(conn, &payload, tag),
                }
            }
            _ => {
                debug!(
                    name = %String::from_utf8_lossy(name),
                    version,
                    "message not recognized at this version"
                );
                self.fallback(conn, &payload, tag)
            }
        };

        if let Some(reply) = reply {
            self.send(conn, reply.name, reply.payload, reply.tag)?;
        }
        Ok(())
    }

    fn fallback(&mut self, conn: &Connection, payload: &Variant<'_>, tag: i64) -> Option<Reply> {
        let handler = self.handlers.default.as_mut()?;
        handler(conn, MsgId::Unknown, payload, tag)
    }

    /// Encodes, frames, and queues one message. The message must exist in
    /// the registry at the negotiated version. From version 2 on, `tag` is
    /// dropped rather than transmitted.
    pub fn send(
        &self,
        conn: &mut Connection,
        name: &str,
        payload: Variant<'static>,
        tag: i64,
    ) -> Result<(), ProtoError> {
        let version = conn.version()?;
        let spec = registry::lookup(name.as_bytes())
            .ok_or_else(|| ProtoError::MessageNotSupported(name.into()))?;
        if spec.min_version > version {
            return Err(ProtoError::MessageNotSupported(name.into()));
        }

        let wire = if version < 2 {
            let mut items = vec![Variant::str(name.as_bytes().to_vec()), payload];
            if tag > 0 {
                items.push(Variant::Int(tag));
            }
            riptide_benc::encode(&Variant::List(items))
        } else {
            let msg = Variant::Dict(vec![(name.as_bytes().to_vec().into(), payload)]);
            riptide_json::encode(&msg, false)
        };

        let framed = frame::encode_frame(&wire)?;
        conn.outbuf.extend_from_slice(&framed);
        debug!(name, tag, bytes = framed.len(), "queued message");
        Ok(())
    }

    /// [`send`](Engine::send) plus a pending-table entry: `waiter` fires
    /// when a frame with the same tag arrives. Requires a tag-capable
    /// (pre-2) negotiated version and `tag > 0`.
    pub fn send_request(
        &self,
        conn: &mut Connection,
        name: &str,
        payload: Variant<'static>,
        tag: i64,
        waiter: Waiter,
    ) -> Result<(), ProtoError> {
        if conn.version()? >= 2 {
            return Err(ProtoError::TagsUnsupported);
        }
        if tag <= 0 {
            return Err(ProtoError::TagsUnsupported);
        }
        self.send(conn, name, payload, tag)?;
        conn.pending.insert(tag, waiter);
        Ok(())
    }

    /// Queues the version announcement. This is the one legal outbound
    /// frame before the handshake completes, so it bypasses
    /// [`send`](Engine::send).
    pub fn send_version(
        &self,
        conn: &mut Connection,
        label: Option<&str>,
    ) -> Result<(), ProtoError> {
        if conn.state == ConnState::Closed {
            return Err(ProtoError::ConnectionClosed);
        }
        let mut range = vec![
            ("min".into(), Variant::Int(i64::from(PROTO_VERSION_MIN))),
            ("max".into(), Variant::Int(i64::from(PROTO_VERSION_MAX))),
        ];
        if let Some(label) = label {
            range.push(("label".into(), Variant::str(label.as_bytes().to_vec())));
        }
        let announce = Variant::Dict(vec![("version".into(), Variant::Dict(range))]);

        let framed = frame::encode_frame(&riptide_benc::encode(&announce))?;
        conn.outbuf.extend_from_slice(&framed);
        Ok(())
    }

    /// Tears down the connection's state. Every pending request fails with
    /// [`ProtoError::ConnectionClosed`]; buffered bytes in both directions
    /// are discarded.
    pub fn close(&self, conn: &mut Connection) {
        if conn.state == ConnState::Closed {
            return;
        }
        conn.state = ConnState::Closed;
        conn.inbuf.clear();
        conn.outbuf.clear();
        for (_, waiter) in conn.pending.drain() {
            waiter(Err(ProtoError::ConnectionClosed));
        }
    }
}
