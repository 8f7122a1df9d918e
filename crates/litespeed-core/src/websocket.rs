//! RFC 6455 server-side frame codec and opening handshake.
//!
//! The codec is incremental and transport-free: [`decode_frame`] inspects a
//! byte buffer and either yields a complete frame plus the number of bytes
//! consumed, or reports that more input is needed. Client-to-server frames
//! must be masked; server-to-client frames produced by [`encode_frame`] are
//! unmasked.

/// Handshake GUID from RFC 6455 §1.3.
const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Largest payload a single frame may carry. Guards against hostile length
/// prefixes before any allocation happens.
const MAX_FRAME_PAYLOAD: u64 = 16 * 1024 * 1024;

// ============================================================================
// Frames
// ============================================================================

/// WebSocket frame opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    /// Decode the 4-bit opcode field.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Continuation),
            0x1 => Some(Self::Text),
            0x2 => Some(Self::Binary),
            0x8 => Some(Self::Close),
            0x9 => Some(Self::Ping),
            0xA => Some(Self::Pong),
            _ => None,
        }
    }

    /// The wire value.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
        }
    }

    /// Control frames may not be fragmented and carry at most 125 bytes.
    #[must_use]
    pub fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

/// One decoded (or to-be-encoded) frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: OpCode,
    pub payload: Vec<u8>,
}

impl Frame {
    /// A final text frame.
    #[must_use]
    pub fn text(payload: impl Into<String>) -> Self {
        Self {
            fin: true,
            opcode: OpCode::Text,
            payload: payload.into().into_bytes(),
        }
    }

    /// A final binary frame.
    #[must_use]
    pub fn binary(payload: Vec<u8>) -> Self {
        Self {
            fin: true,
            opcode: OpCode::Binary,
            payload,
        }
    }

    /// A pong answering a ping, echoing its payload.
    #[must_use]
    pub fn pong(payload: Vec<u8>) -> Self {
        Self {
            fin: true,
            opcode: OpCode::Pong,
            payload,
        }
    }

    /// An empty close frame.
    #[must_use]
    pub fn close() -> Self {
        Self {
            fin: true,
            opcode: OpCode::Close,
            payload: Vec::new(),
        }
    }
}

/// Frame decoding failure. Any of these ends the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The frame violates the protocol.
    Protocol(&'static str),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Protocol(reason) => write!(f, "websocket protocol violation: {reason}"),
        }
    }
}

impl std::error::Error for FrameError {}

/// Try to decode one client frame from the front of `buf`.
///
/// Returns `Ok(None)` when the buffer does not yet hold a complete frame,
/// and `Ok(Some((frame, consumed)))` once it does.
///
/// # Errors
/// [`FrameError::Protocol`] for unmasked client frames, unknown opcodes,
/// fragmented or oversized control frames, and hostile payload lengths.
pub fn decode_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>, FrameError> {
    if buf.len() < 2 {
        return Ok(None);
    }
    let fin = buf[0] & 0x80 != 0;
    if buf[0] & 0x70 != 0 {
        return Err(FrameError::Protocol("reserved bits set"));
    }
    let opcode =
        OpCode::from_u8(buf[0] & 0x0F).ok_or(FrameError::Protocol("unknown opcode"))?;
    let masked = buf[1] & 0x80 != 0;
    if !masked {
        return Err(FrameError::Protocol("client frames must be masked"));
    }
    let len7 = buf[1] & 0x7F;

    let mut idx = 2;
    let payload_len: u64 = match len7 {
        126 => {
            if buf.len() < idx + 2 {
                return Ok(None);
            }
            let len = u64::from(u16::from_be_bytes([buf[idx], buf[idx + 1]]));
            idx += 2;
            len
        }
        127 => {
            if buf.len() < idx + 8 {
                return Ok(None);
            }
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&buf[idx..idx + 8]);
            idx += 8;
            let len = u64::from_be_bytes(bytes);
            if len & (1 << 63) != 0 {
                return Err(FrameError::Protocol("invalid 64-bit length"));
            }
            len
        }
        n => u64::from(n),
    };

    if opcode.is_control() {
        if !fin {
            return Err(FrameError::Protocol("fragmented control frame"));
        }
        if payload_len > 125 {
            return Err(FrameError::Protocol("oversized control frame"));
        }
    }
    if payload_len > MAX_FRAME_PAYLOAD {
        return Err(FrameError::Protocol("frame payload too large"));
    }

    if buf.len() < idx + 4 {
        return Ok(None);
    }
    let mask = [buf[idx], buf[idx + 1], buf[idx + 2], buf[idx + 3]];
    idx += 4;

    let payload_len = payload_len as usize;
    if buf.len() < idx + payload_len {
        return Ok(None);
    }
    let payload: Vec<u8> = buf[idx..idx + payload_len]
        .iter()
        .enumerate()
        .map(|(i, b)| b ^ mask[i % 4])
        .collect();

    Ok(Some((
        Frame {
            fin,
            opcode,
            payload,
        },
        idx + payload_len,
    )))
}

/// Encode a server frame (unmasked).
#[must_use]
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let len = frame.payload.len();
    let mut out = Vec::with_capacity(len + 10);
    let fin_bit = if frame.fin { 0x80 } else { 0x00 };
    out.push(fin_bit | frame.opcode.as_u8());
    if len <= 125 {
        out.push(len as u8);
    } else if len <= usize::from(u16::MAX) {
        out.push(126);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(127);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }
    out.extend_from_slice(&frame.payload);
    out
}

// ============================================================================
// Handshake
// ============================================================================

/// Opening-handshake failure, answered with 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeError {
    /// No `Sec-WebSocket-Key` header.
    MissingKey,
    /// The key is not a base64-encoded 16-byte nonce.
    InvalidKey,
}

impl std::fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKey => write!(f, "missing Sec-WebSocket-Key header"),
            Self::InvalidKey => write!(f, "Sec-WebSocket-Key is not a 16-byte base64 nonce"),
        }
    }
}

impl std::error::Error for HandshakeError {}

/// Compute the `Sec-WebSocket-Accept` value for a client key.
///
/// # Errors
/// [`HandshakeError`] when the key is empty or not a base64 16-byte nonce.
pub fn accept_key(key: &str) -> Result<String, HandshakeError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(HandshakeError::MissingKey);
    }
    let nonce = base64_decode(key).ok_or(HandshakeError::InvalidKey)?;
    if nonce.len() != 16 {
        return Err(HandshakeError::InvalidKey);
    }
    let digest = sha1(format!("{key}{WS_GUID}").as_bytes());
    Ok(base64_encode(&digest))
}

// ============================================================================
// SHA-1 / base64 (handshake only)
// ============================================================================

fn sha1(message: &[u8]) -> [u8; 20] {
    let mut h: [u32; 5] = [
        0x6745_2301,
        0xEFCD_AB89,
        0x98BA_DCFE,
        0x1032_5476,
        0xC3D2_E1F0,
    ];

    let mut padded = message.to_vec();
    padded.push(0x80);
    while padded.len() % 64 != 56 {
        padded.push(0);
    }
    padded.extend_from_slice(&((message.len() as u64) * 8).to_be_bytes());

    for block in padded.chunks_exact(64) {
        let mut w = [0u32; 80];
        for (i, word) in w.iter_mut().take(16).enumerate() {
            *word = u32::from_be_bytes([
                block[4 * i],
                block[4 * i + 1],
                block[4 * i + 2],
                block[4 * i + 3],
            ]);
        }
        for i in 16..80 {
            w[i] = (w[i - 3] ^ w[i - 8] ^ w[i - 14] ^ w[i - 16]).rotate_left(1);
        }

        let [mut a, mut b, mut c, mut d, mut e] = h;
        for (i, &word) in w.iter().enumerate() {
            let (f, k) = match i / 20 {
                0 => ((b & c) | (!b & d), 0x5A82_7999),
                1 => (b ^ c ^ d, 0x6ED9_EBA1),
                2 => ((b & c) | (b & d) | (c & d), 0x8F1B_BCDC),
                _ => (b ^ c ^ d, 0xCA62_C1D6),
            };
            let next = a
                .rotate_left(5)
                .wrapping_add(f)
                .wrapping_add(e)
                .wrapping_add(k)
                .wrapping_add(word);
            e = d;
            d = c;
            c = b.rotate_left(30);
            b = a;
            a = next;
        }

        h[0] = h[0].wrapping_add(a);
        h[1] = h[1].wrapping_add(b);
        h[2] = h[2].wrapping_add(c);
        h[3] = h[3].wrapping_add(d);
        h[4] = h[4].wrapping_add(e);
    }

    let mut digest = [0u8; 20];
    for (i, word) in h.iter().enumerate() {
        digest[4 * i..4 * i + 4].copy_from_slice(&word.to_be_bytes());
    }
    digest
}

const B64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn base64_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let mut word = 0u32;
        for (i, b) in chunk.iter().enumerate() {
            word |= u32::from(*b) << (16 - 8 * i);
        }
        for i in 0..4 {
            if i <= chunk.len() {
                let sextet = ((word >> (18 - 6 * i)) & 0x3F) as usize;
                out.push(B64_ALPHABET[sextet] as char);
            } else {
                out.push('=');
            }
        }
    }
    out
}

fn base64_decode(input: &str) -> Option<Vec<u8>> {
    let bytes = input.as_bytes();
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return None;
    }
    let sextet = |b: u8| -> Option<u32> {
        B64_ALPHABET
            .iter()
            .position(|&c| c == b)
            .map(|p| p as u32)
    };

    let mut out = Vec::with_capacity(bytes.len() / 4 * 3);
    for quad in bytes.chunks(4) {
        let pad = quad.iter().rev().take_while(|&&b| b == b'=').count();
        if pad > 2 {
            return None;
        }
        let mut word = 0u32;
        for (i, &b) in quad.iter().enumerate() {
            if b == b'=' {
                if i < 4 - pad {
                    return None;
                }
                continue;
            }
            word |= sextet(b)? << (18 - 6 * i);
        }
        out.push((word >> 16) as u8);
        if pad < 2 {
            out.push((word >> 8) as u8);
        }
        if pad == 0 {
            out.push(word as u8);
        }
    }
    Some(out)
}
