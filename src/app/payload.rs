//! Bounded decoding of inbound MQTT payloads.
//!
//! The transport hands us a byte slice that is **not** terminated and a
//! declared total length that may not match what was actually delivered
//! (fragmented publishes, truncated buffers).  Decoding copies exactly the
//! declared length into a fixed-capacity buffer, appends the terminator
//! itself, and only then treats the bytes as text.
//!
//! | condition                      | result                 |
//! |--------------------------------|------------------------|
//! | `declared >= C`                | `Oversized`            |
//! | `declared > bytes.len()`       | `Truncated`            |
//! | first `declared` bytes not UTF-8 | `NotText`            |
//! | otherwise                      | `Ok(PayloadText)`      |

use core::fmt;

/// Capacity of the command payload buffer, terminator included.
pub const PAYLOAD_CAPACITY: usize = 128;

/// Decoded command text at the default capacity.
pub type CommandText = PayloadText<PAYLOAD_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    /// Declared length leaves no room for the terminator.
    Oversized { declared: usize, capacity: usize },
    /// Fewer bytes were delivered than declared.
    Truncated { declared: usize, available: usize },
    /// Payload is not valid UTF-8.
    NotText,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oversized { declared, capacity } => {
                write!(f, "{declared} bytes exceeds capacity {capacity}")
            }
            Self::Truncated {
                declared,
                available,
            } => write!(f, "declared {declared} bytes, only {available} delivered"),
            Self::NotText => write!(f, "not UTF-8 text"),
        }
    }
}

/// Terminated text copied out of a transport buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadText<const C: usize> {
    /// Text followed by a single NUL.
    buf: heapless::String<C>,
    len: usize,
}

impl<const C: usize> PayloadText<C> {
    /// The decoded text, terminator excluded.
    pub fn as_str(&self) -> &str {
        &self.buf[..self.len]
    }

    /// The decoded text including the trailing NUL.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Decode `declared_len` bytes of `bytes` into a buffer of capacity `C`.
///
/// Never reads past `declared_len` and never writes past `C`.
pub fn decode_payload<const C: usize>(
    bytes: &[u8],
    declared_len: usize,
) -> Result<PayloadText<C>, PayloadError> {
    if declared_len >= C {
        return Err(PayloadError::Oversized {
            declared: declared_len,
            capacity: C,
        });
    }
    let Some(exact) = bytes.get(..declared_len) else {
        return Err(PayloadError::Truncated {
            declared: declared_len,
            available: bytes.len(),
        });
    };
    let text = core::str::from_utf8(exact).map_err(|_| PayloadError::NotText)?;

    let mut buf = heapless::String::new();
    // Both fit: declared_len + 1 <= C.
    buf.push_str(text).map_err(|()| PayloadError::Oversized {
        declared: declared_len,
        capacity: C,
    })?;
    buf.push('\0').map_err(|()| PayloadError::Oversized {
        declared: declared_len,
        capacity: C,
    })?;

    Ok(PayloadText {
        buf,
        len: declared_len,
    })
}
