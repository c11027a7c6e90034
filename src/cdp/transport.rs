//! CDP transport
//!
//! A minimal WebSocket client for the DevTools wire protocol: one TCP
//! stream, a reader thread that routes responses to pending requests, and
//! monotonically increasing message ids multiplexing concurrent commands.
//!
//! The transport attaches to an already-running browser; it neither launches
//! nor kills one.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tokio::sync::{oneshot, Mutex};

use crate::error::{Error, Result};

type PendingRequest = oneshot::Sender<Result<Value>>;
type PendingMap = Arc<Mutex<HashMap<u64, PendingRequest>>>;

mod opcode {
    pub const TEXT: u8 = 0x1;
    pub const CLOSE: u8 = 0x8;
    pub const PING: u8 = 0x9;
    pub const PONG: u8 = 0xA;
}

/// Encode one client frame. Clients must mask every frame (RFC 6455).
fn encode_frame(op: u8, data: &[u8]) -> Vec<u8> {
    let len = data.len();
    let mut frame = Vec::with_capacity(14 + len);

    // FIN + opcode
    frame.push(0x80 | op);

    // Mask bit, then payload length
    if len < 126 {
        frame.push(0x80 | len as u8);
    } else if len < 65536 {
        frame.push(0x80 | 126);
        frame.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        frame.push(0x80 | 127);
        frame.extend_from_slice(&(len as u64).to_be_bytes());
    }

    let mask: [u8; 4] = rand::random();
    frame.extend_from_slice(&mask);
    frame.extend(data.iter().enumerate().map(|(i, byte)| byte ^ mask[i % 4]));
    frame
}

/// Read one frame, returning (opcode, unmasked payload)
fn read_frame<R: Read>(stream: &mut R) -> std::io::Result<(u8, Vec<u8>)> {
    let mut header = [0u8; 2];
    stream.read_exact(&mut header)?;

    let op = header[0] & 0x0F;
    let masked = header[1] & 0x80 != 0;
    let mut len = u64::from(header[1] & 0x7F);

    if len == 126 {
        let mut ext = [0u8; 2];
        stream.read_exact(&mut ext)?;
        len = u64::from(u16::from_be_bytes(ext));
    } else if len == 127 {
        let mut ext = [0u8; 8];
        stream.read_exact(&mut ext)?;
        len = u64::from_be_bytes(ext);
    }

    let mask = if masked {
        let mut key = [0u8; 4];
        stream.read_exact(&mut key)?;
        Some(key)
    } else {
        None
    };

    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload)?;

    if let Some(key) = mask {
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= key[i % 4];
        }
    }

    Ok((op, payload))
}

/// CDP transport over a DevTools WebSocket endpoint
pub struct Transport {
    writer: Mutex<TcpStream>,
    next_id: AtomicU64,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
}

impl Transport {
    /// Connect to a DevTools WebSocket endpoint
    /// (`ws://host:port/devtools/browser/<id>`)
    pub fn connect(ws_url: &str) -> Result<Self> {
        let trimmed = ws_url.trim_start_matches("ws://");
        let (host_port, path) = match trimmed.split_once('/') {
            Some((host, path)) => (host, format!("/{path}")),
            None => (trimmed, "/".to_string()),
        };

        let mut stream = TcpStream::connect(host_port)
            .map_err(|e| Error::transport_io("failed to connect to DevTools endpoint", e))?;

        use base64::Engine as _;
        let key = base64::engine::general_purpose::STANDARD.encode(rand::random::<[u8; 16]>());
        let upgrade = format!(
            "GET {path} HTTP/1.1\r\n\
             Host: {host_port}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {key}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n"
        );
        stream
            .write_all(upgrade.as_bytes())
            .map_err(|e| Error::transport_io("handshake write failed", e))?;

        let mut response = [0u8; 1024];
        let n = stream
            .read(&mut response)
            .map_err(|e| Error::transport_io("handshake read failed", e))?;
        let response = String::from_utf8_lossy(&response[..n]);
        if !response.starts_with("HTTP/1.1 101") {
            return Err(Error::transport(format!(
                "WebSocket upgrade refused: {}",
                response.lines().next().unwrap_or("")
            )));
        }

        tracing::debug!(%ws_url, "WebSocket connected");

        let reader = stream
            .try_clone()
            .map_err(|e| Error::transport_io("failed to clone stream", e))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        {
            let pending = Arc::clone(&pending);
            let closed = Arc::clone(&closed);
            std::thread::spawn(move || reader_loop(reader, &pending, &closed));
        }

        Ok(Self {
            writer: Mutex::new(stream),
            next_id: AtomicU64::new(1),
            pending,
            closed,
        })
    }

    /// Whether the connection can still carry commands
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    /// Send a command on the browser-level channel
    pub async fn send<C, R>(&self, method: &str, params: &C) -> Result<R>
    where
        C: Serialize,
        R: DeserializeOwned,
    {
        self.send_inner(None, method, params).await
    }

    /// Send a command scoped to an attached session
    pub async fn send_to_session<C, R>(&self, session_id: &str, method: &str, params: &C) -> Result<R>
    where
        C: Serialize,
        R: DeserializeOwned,
    {
        self.send_inner(Some(session_id), method, params).await
    }

    async fn send_inner<C, R>(&self, session_id: Option<&str>, method: &str, params: &C) -> Result<R>
    where
        C: Serialize,
        R: DeserializeOwned,
    {
        if !self.is_open() {
            return Err(Error::transport("connection is closed"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        let mut message = json!({
            "id": id,
            "method": method,
            "params": serde_json::to_value(params)?,
        });
        if let Some(session_id) = session_id {
            message["sessionId"] = Value::String(session_id.to_string());
        }

        let data = serde_json::to_string(&message)?;
        {
            let mut writer = self.writer.lock().await;
            writer
                .write_all(&encode_frame(opcode::TEXT, data.as_bytes()))
                .and_then(|()| writer.flush())
                .map_err(|e| Error::transport_io("WebSocket write failed", e))?;
        }

        tracing::trace!(method, id, session = session_id.unwrap_or(""), "sent command");

        let result = rx
            .await
            .map_err(|_| Error::transport("response channel closed"))??;
        Ok(serde_json::from_value(result)?)
    }

    /// Close the WebSocket. Pending requests fail; the browser keeps running.
    pub async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let mut writer = self.writer.lock().await;
        let _ = writer.write_all(&encode_frame(opcode::CLOSE, &[]));
        let _ = writer.flush();
        Ok(())
    }
}

fn reader_loop(mut stream: TcpStream, pending: &PendingMap, closed: &AtomicBool) {
    loop {
        let (op, payload) = match read_frame(&mut stream) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("WebSocket read error: {e}");
                break;
            }
        };

        match op {
            opcode::TEXT => {
                let text = match String::from_utf8(payload) {
                    Ok(text) => text,
                    Err(_) => continue,
                };
                let message: Value = match serde_json::from_str(&text) {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::warn!("unparseable CDP message: {e}");
                        continue;
                    }
                };
                route_message(message, pending);
            }
            opcode::PING => {
                let _ = stream.write_all(&encode_frame(opcode::PONG, &[]));
            }
            opcode::CLOSE => {
                tracing::debug!("WebSocket closed by server");
                break;
            }
            _ => {}
        }
    }

    closed.store(true, Ordering::SeqCst);

    // Fail anything still waiting so callers observe the dead connection
    // instead of hanging on a response that will never arrive.
    let mut pending = pending.blocking_lock();
    for (_, tx) in pending.drain() {
        let _ = tx.send(Err(Error::transport("connection closed before response")));
    }

    tracing::debug!("CDP reader loop ended");
}

fn route_message(message: Value, pending: &PendingMap) {
    if let Some(id) = message.get("id").and_then(Value::as_u64) {
        let result = match message.get("error") {
            Some(error) => Err(Error::cdp(
                message
                    .get("method")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown"),
                error.get("code").and_then(Value::as_i64).unwrap_or(-1),
                error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown"),
            )),
            None => Ok(message.get("result").cloned().unwrap_or_else(|| json!({}))),
        };

        let mut pending = pending.blocking_lock();
        match pending.remove(&id) {
            Some(tx) => {
                let _ = tx.send(result);
            }
            None => tracing::trace!(id, "response for unknown id"),
        }
    } else if let Some(method) = message.get("method").and_then(Value::as_str) {
        // Events have no consumer in this crate; surface them for debugging.
        tracing::trace!(method, "event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frame_round_trip() {
        let payload = br#"{"id":1,"method":"Browser.getVersion"}"#;
        let frame = encode_frame(opcode::TEXT, payload);
        let mut cursor = Cursor::new(frame);

        let (op, decoded) = read_frame(&mut cursor).unwrap();
        assert_eq!(op, opcode::TEXT);
        assert_eq!(decoded, payload);
    }

    #[test]
    fn frame_round_trip_extended_lengths() {
        for len in [200usize, 70_000] {
            let payload = vec![0xAB; len];
            let frame = encode_frame(opcode::TEXT, &payload);
            let mut cursor = Cursor::new(frame);

            let (op, decoded) = read_frame(&mut cursor).unwrap();
            assert_eq!(op, opcode::TEXT);
            assert_eq!(decoded, payload);
        }
    }

    #[test]
    fn client_frames_are_masked() {
        let frame = encode_frame(opcode::TEXT, b"x");
        assert_eq!(frame[0], 0x80 | opcode::TEXT);
        assert_eq!(frame[1] & 0x80, 0x80);
    }
}
