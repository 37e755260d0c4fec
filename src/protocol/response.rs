//! Response frame decoding.
//!
//! Every exchange is answered with the same 21-byte frame:
//! ```text
//! ┌────────┬──────────┬───────────┬──────────┬──────────┬──────────┐
//! │command │ address  │ read type │ lsb      │ msb      │ error    │
//! │ 1 byte │ uint32 LE│ uint32 LE │ uint32 LE│ uint32 LE│ uint32 LE│
//! └────────┴──────────┴───────────┴──────────┴──────────┴──────────┘
//! ```
//!
//! `read_type` has no documented meaning on the response side and is kept
//! as received.

use super::wire_format::RESPONSE_SIZE;
use crate::error::{QfpromError, Result};
use crate::register::{DeviceError, RegisterResult, RegisterRow};

/// Decoded response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterResponse {
    pub command: u8,
    pub address: u32,
    pub read_type: u32,
    pub lsb: u32,
    pub msb: u32,
    pub error: u32,
}

#[inline]
fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

impl RegisterResponse {
    /// Decode a response frame.
    ///
    /// The slice must be exactly [`RESPONSE_SIZE`] bytes; anything else is a
    /// protocol error rather than a silently truncated or padded result.
    ///
    /// # Example
    ///
    /// ```
    /// use qfprom_client::protocol::RegisterResponse;
    ///
    /// let mut frame = [0u8; 21];
    /// frame[0] = 0x01;
    /// frame[1..5].copy_from_slice(&0x1000u32.to_le_bytes());
    /// let resp = RegisterResponse::decode(&frame).unwrap();
    /// assert_eq!(resp.address, 0x1000);
    /// assert!(resp.is_success());
    /// ```
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != RESPONSE_SIZE {
            return Err(QfpromError::Protocol(format!(
                "Response frame is {} bytes, expected {}",
                buf.len(),
                RESPONSE_SIZE
            )));
        }
        Ok(Self {
            command: buf[0],
            address: le_u32(buf, 1),
            read_type: le_u32(buf, 5),
            lsb: le_u32(buf, 9),
            msb: le_u32(buf, 13),
            error: le_u32(buf, 17),
        })
    }

    /// Encode back to wire bytes. Used by mock services in tests and tooling.
    pub fn encode(&self) -> [u8; RESPONSE_SIZE] {
        let mut buf = [0u8; RESPONSE_SIZE];
        buf[0] = self.command;
        buf[1..5].copy_from_slice(&self.address.to_le_bytes());
        buf[5..9].copy_from_slice(&self.read_type.to_le_bytes());
        buf[9..13].copy_from_slice(&self.lsb.to_le_bytes());
        buf[13..17].copy_from_slice(&self.msb.to_le_bytes());
        buf[17..21].copy_from_slice(&self.error.to_le_bytes());
        buf
    }

    /// The service reported no error.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.error == 0
    }

    /// Convert into the caller-facing result. A nonzero error code becomes
    /// [`RegisterResult::Rejected`], never an `Err`.
    pub fn into_result(self) -> RegisterResult {
        if self.is_success() {
            RegisterResult::Row(RegisterRow {
                address: self.address,
                lsb: self.lsb,
                msb: self.msb,
            })
        } else {
            RegisterResult::Rejected(DeviceError {
                address: self.address,
                code: self.error,
            })
        }
    }
}
