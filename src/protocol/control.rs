//! Payload schemas for the small set of control messages the core must
//! interpret: `Ok`, `Error`, `Notice`, the `Capabilities{Get,Set}` exchange,
//! the `Authenticate{Start,Continue,Ok}` family, `StmtExecuteOk`, and the
//! `Resultset.*` family. Everything else stays opaque `Bytes` at this layer
//! (query-builder/CRUD payloads are an external collaborator).
//!
//! Byte-for-byte compatibility with the X Plugin's protobuf schema is out of
//! scope for this core; the encoding below is a self-consistent
//! length-prefixed format sufficient to exercise the state machine and
//! dispatcher faithfully.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

fn read_u32(buf: &mut &[u8]) -> Result<u32> {
    if buf.len() < 4 {
        return Err(Error::MalformedFrame("expected 4 more bytes".to_string()));
    }
    let v = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    *buf = &buf[4..];
    Ok(v)
}

fn read_string(buf: &mut &[u8]) -> Result<String> {
    let len = read_u32(buf)? as usize;
    if buf.len() < len {
        return Err(Error::MalformedFrame(format!(
            "expected {len} more string bytes, had {}",
            buf.len()
        )));
    }
    let (head, rest) = buf.split_at(len);
    *buf = rest;
    String::from_utf8(head.to_vec())
        .map_err(|e| Error::MalformedFrame(format!("invalid utf8 in string field: {e}")))
}

fn read_bytes(buf: &mut &[u8]) -> Result<Bytes> {
    let len = read_u32(buf)? as usize;
    if buf.len() < len {
        return Err(Error::MalformedFrame(format!(
            "expected {len} more payload bytes, had {}",
            buf.len()
        )));
    }
    let (head, rest) = buf.split_at(len);
    *buf = rest;
    Ok(Bytes::copy_from_slice(head))
}

fn write_string(out: &mut BytesMut, s: &str) {
    out.put_u32_le(s.len() as u32);
    out.put_slice(s.as_bytes());
}

fn write_bytes(out: &mut BytesMut, b: &[u8]) {
    out.put_u32_le(b.len() as u32);
    out.put_slice(b);
}

/// A capability value, scalar or structured.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityValue {
    Bool(bool),
    Str(String),
    StrList(Vec<String>),
}

impl CapabilityValue {
    fn write(&self, out: &mut BytesMut) {
        match self {
            CapabilityValue::Bool(b) => {
                out.put_u8(0);
                out.put_u8(*b as u8);
            }
            CapabilityValue::Str(s) => {
                out.put_u8(1);
                write_string(out, s);
            }
            CapabilityValue::StrList(items) => {
                out.put_u8(2);
                out.put_u32_le(items.len() as u32);
                for item in items {
                    write_string(out, item);
                }
            }
        }
    }

    fn read(buf: &mut &[u8]) -> Result<Self> {
        if buf.is_empty() {
            return Err(Error::MalformedFrame("expected capability value tag".to_string()));
        }
        let tag = buf[0];
        *buf = &buf[1..];
        match tag {
            0 => {
                if buf.is_empty() {
                    return Err(Error::MalformedFrame("expected bool byte".to_string()));
                }
                let v = buf[0] != 0;
                *buf = &buf[1..];
                Ok(CapabilityValue::Bool(v))
            }
            1 => Ok(CapabilityValue::Str(read_string(buf)?)),
            2 => {
                let count = read_u32(buf)?;
                let mut items = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    items.push(read_string(buf)?);
                }
                Ok(CapabilityValue::StrList(items))
            }
            other => Err(Error::MalformedFrame(format!(
                "unknown capability value tag {other}"
            ))),
        }
    }
}

pub type Capabilities = BTreeMap<String, CapabilityValue>;

pub fn encode_capabilities(caps: &Capabilities) -> Bytes {
    let mut out = BytesMut::new();
    out.put_u32_le(caps.len() as u32);
    for (key, value) in caps {
        write_string(&mut out, key);
        value.write(&mut out);
    }
    out.freeze()
}

pub fn decode_capabilities(payload: &[u8]) -> Result<Capabilities> {
    let mut buf = payload;
    let count = read_u32(&mut buf)?;
    let mut caps = Capabilities::new();
    for _ in 0..count {
        let key = read_string(&mut buf)?;
        let value = CapabilityValue::read(&mut buf)?;
        caps.insert(key, value);
    }
    Ok(caps)
}

/// `ConnectionCapabilitiesSet` payload: the only field the core drives is the
/// TLS-upgrade request.
pub struct CapabilitiesSetTls {
    pub tls: bool,
}

impl CapabilitiesSetTls {
    pub fn encode(&self) -> Bytes {
        let mut caps = Capabilities::new();
        caps.insert("tls".to_string(), CapabilityValue::Bool(self.tls));
        encode_capabilities(&caps)
    }
}

/// `AuthenticateStart` payload.
pub struct AuthenticateStart {
    pub mechanism: String,
    pub auth_data: Bytes,
}

impl AuthenticateStart {
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        write_string(&mut out, &self.mechanism);
        write_bytes(&mut out, &self.auth_data);
        out.freeze()
    }
}

/// `AuthenticateContinue` payload, sent by the client.
pub struct AuthenticateContinue {
    pub auth_data: Bytes,
}

impl AuthenticateContinue {
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        write_bytes(&mut out, &self.auth_data);
        out.freeze()
    }
}

/// The server's half of `AuthenticateContinue`: the next challenge.
pub fn decode_auth_challenge(payload: &[u8]) -> Result<Bytes> {
    let mut buf = payload;
    read_bytes(&mut buf)
}

/// Server `Error` frame payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorPayload {
    pub code: u32,
    pub sql_state: String,
    pub message: String,
}

impl ErrorPayload {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut buf = payload;
        let code = read_u32(&mut buf)?;
        let sql_state = read_string(&mut buf)?;
        let message = read_string(&mut buf)?;
        Ok(Self {
            code,
            sql_state,
            message,
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        out.put_u32_le(self.code);
        write_string(&mut out, &self.sql_state);
        write_string(&mut out, &self.message);
        out.freeze()
    }
}

/// `StmtExecuteOk` payload: affected rows, generated id, and warning count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StmtExecuteOk {
    pub rows_affected: u64,
    pub last_insert_id: u64,
    pub warnings: u32,
}

impl StmtExecuteOk {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut buf = payload;
        let rows_affected = u64::from(read_u32(&mut buf)?) | (u64::from(read_u32(&mut buf)?) << 32);
        let last_insert_id = u64::from(read_u32(&mut buf)?) | (u64::from(read_u32(&mut buf)?) << 32);
        let warnings = read_u32(&mut buf)?;
        Ok(Self {
            rows_affected,
            last_insert_id,
            warnings,
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        out.put_u32_le(self.rows_affected as u32);
        out.put_u32_le((self.rows_affected >> 32) as u32);
        out.put_u32_le(self.last_insert_id as u32);
        out.put_u32_le((self.last_insert_id >> 32) as u32);
        out.put_u32_le(self.warnings);
        out.freeze()
    }
}

/// Kind carried by a `Notice.Frame`.
#[derive(Debug, Clone, PartialEq)]
pub enum NoticeKind {
    Warning { level: u32, code: u32, message: String },
    SessionStateChange { name: String, value: String },
    SessionVariableChange { name: String, value: String },
    Other { kind: u32, payload: Bytes },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
}

impl Notice {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut buf = payload;
        if buf.is_empty() {
            return Err(Error::MalformedFrame("empty notice payload".to_string()));
        }
        let tag = buf[0];
        buf = &buf[1..];
        let kind = match tag {
            1 => {
                let level = read_u32(&mut buf)?;
                let code = read_u32(&mut buf)?;
                let message = read_string(&mut buf)?;
                NoticeKind::Warning { level, code, message }
            }
            2 => {
                let name = read_string(&mut buf)?;
                let value = read_string(&mut buf)?;
                NoticeKind::SessionStateChange { name, value }
            }
            3 => {
                let name = read_string(&mut buf)?;
                let value = read_string(&mut buf)?;
                NoticeKind::SessionVariableChange { name, value }
            }
            other => {
                let payload = read_bytes(&mut buf)?;
                NoticeKind::Other { kind: other as u32, payload }
            }
        };
        Ok(Self { kind })
    }
}

/// A single column's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetaData {
    pub name: String,
    pub type_id: u32,
}

impl ColumnMetaData {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut buf = payload;
        let type_id = read_u32(&mut buf)?;
        let name = read_string(&mut buf)?;
        Ok(Self { name, type_id })
    }

    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        out.put_u32_le(self.type_id);
        write_string(&mut out, &self.name);
        out.freeze()
    }
}

/// A data row. The core never interprets the field bytes (they are an opaque
/// record keyed by the preceding `ColumnMetaData`).
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub fields: Bytes,
}

impl Row {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(Self {
            fields: Bytes::copy_from_slice(payload),
        })
    }
}
