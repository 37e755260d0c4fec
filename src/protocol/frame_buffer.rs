//! Response buffer for accumulating partial reads.
//!
//! A stream transport may deliver one 21-byte response across several
//! reads. [`ResponseBuffer`] collects bytes until the frame is complete and
//! only then decodes it.
//!
//! # Example
//!
//! ```
//! use qfprom_client::protocol::{ResponseBuffer, RESPONSE_SIZE};
//!
//! let mut buffer = ResponseBuffer::new();
//! let frame = [0u8; RESPONSE_SIZE];
//!
//! assert!(buffer.push(&frame[..8]).unwrap().is_none());
//! assert_eq!(buffer.remaining(), RESPONSE_SIZE - 8);
//! let response = buffer.push(&frame[8..]).unwrap().unwrap();
//! assert_eq!(response.error, 0);
//! ```

use bytes::BytesMut;

use super::response::RegisterResponse;
use super::wire_format::RESPONSE_SIZE;
use crate::error::{QfpromError, Result};

/// Buffer holding at most one partially received response frame.
///
/// The exchange is half-duplex, so the service never has more than one
/// frame in flight. Bytes beyond the end of the current frame are a protocol
/// violation rather than the start of a next frame.
#[derive(Debug)]
pub struct ResponseBuffer {
    buffer: BytesMut,
}

impl ResponseBuffer {
    /// Create an empty response buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(RESPONSE_SIZE),
        }
    }

    /// Push received bytes and return the response once it is complete.
    ///
    /// Returns `Ok(None)` while more bytes are needed. After a response is
    /// returned the buffer is empty and ready for the next exchange.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if `data` would overrun the frame.
    pub fn push(&mut self, data: &[u8]) -> Result<Option<RegisterResponse>> {
        if data.len() > self.remaining() {
            return Err(QfpromError::Protocol(format!(
                "Received {} unexpected bytes past the {}-byte response frame",
                data.len() - self.remaining(),
                RESPONSE_SIZE
            )));
        }

        self.buffer.extend_from_slice(data);

        if self.buffer.len() < RESPONSE_SIZE {
            return Ok(None);
        }

        let frame = self.buffer.split_to(RESPONSE_SIZE);
        RegisterResponse::decode(&frame).map(Some)
    }

    /// Bytes still missing from the current frame.
    #[inline]
    pub fn remaining(&self) -> usize {
        RESPONSE_SIZE - self.buffer.len()
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop any partial frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}
