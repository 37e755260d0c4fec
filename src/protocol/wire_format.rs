//! Wire format encoding for register requests.
//!
//! Request frames, all multi-byte integers Little Endian:
//! ```text
//! Read        ┌────────┬──────────┬───────────┐
//! (9 bytes)   │ 0x01   │ address  │ corrected │
//!             │ 1 byte │ uint32 LE│ uint32 LE │
//!             └────────┴──────────┴───────────┘
//! Write       ┌────────┬──────────┬───────────┬──────────┬──────────┐
//! (17 bytes)  │ 0x01   │ address  │ bus kHz   │ lsb      │ msb      │
//!             └────────┴──────────┴───────────┴──────────┴──────────┘
//! ReadDirect  ┌────────┬──────────┬───────────┐
//! (9 bytes)   │ 0x03   │ address  │ 0         │
//!             └────────┴──────────┴───────────┘
//! Disconnect  ┌────────┐
//! (1 byte)    │ 0x00   │
//!             └────────┘
//! ```
//!
//! Read and Write share opcode `0x01`. The service tells them apart by the
//! number of bytes received, so a frame must always be sent whole.

/// Size of a read (or read-direct) request frame.
pub const READ_REQUEST_SIZE: usize = 9;

/// Size of a write request frame.
pub const WRITE_REQUEST_SIZE: usize = 17;

/// Size of the disconnect frame.
pub const DISCONNECT_REQUEST_SIZE: usize = 1;

/// Size of every response frame.
pub const RESPONSE_SIZE: usize = 21;

/// Largest request frame.
pub const MAX_REQUEST_SIZE: usize = WRITE_REQUEST_SIZE;

/// Opcode bytes understood by the fuse service.
pub mod opcode {
    /// Ends the session. No response follows.
    pub const DISCONNECT: u8 = 0x00;
    /// Read or write a row through the secure-world fuse service.
    pub const ROW: u8 = 0x01;
    /// Read a row straight from the memory-mapped fuse region.
    pub const READ_DIRECT: u8 = 0x03;
}

/// Raw or error-corrected row read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadType {
    #[default]
    Raw,
    Corrected,
}

impl ReadType {
    /// Value of the `corrected` word on the wire.
    #[inline]
    pub fn wire_value(self) -> u32 {
        match self {
            ReadType::Raw => 0,
            ReadType::Corrected => 1,
        }
    }
}

impl From<bool> for ReadType {
    fn from(corrected: bool) -> Self {
        if corrected {
            ReadType::Corrected
        } else {
            ReadType::Raw
        }
    }
}

/// A request frame sent to the fuse service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterRequest {
    Read {
        address: u32,
        read_type: ReadType,
    },
    Write {
        address: u32,
        bus_clock_khz: u32,
        lsb: u32,
        msb: u32,
    },
    ReadDirect {
        address: u32,
    },
    Disconnect,
}

impl RegisterRequest {
    /// Opcode byte leading the frame.
    #[inline]
    pub fn opcode(&self) -> u8 {
        match self {
            RegisterRequest::Read { .. } | RegisterRequest::Write { .. } => opcode::ROW,
            RegisterRequest::ReadDirect { .. } => opcode::READ_DIRECT,
            RegisterRequest::Disconnect => opcode::DISCONNECT,
        }
    }

    /// Address the request targets, if any.
    #[inline]
    pub fn address(&self) -> Option<u32> {
        match *self {
            RegisterRequest::Read { address, .. }
            | RegisterRequest::Write { address, .. }
            | RegisterRequest::ReadDirect { address } => Some(address),
            RegisterRequest::Disconnect => None,
        }
    }

    /// Encoded frame length in bytes.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        match self {
            RegisterRequest::Read { .. } | RegisterRequest::ReadDirect { .. } => READ_REQUEST_SIZE,
            RegisterRequest::Write { .. } => WRITE_REQUEST_SIZE,
            RegisterRequest::Disconnect => DISCONNECT_REQUEST_SIZE,
        }
    }

    /// Whether the service answers this request with a response frame.
    #[inline]
    pub fn expects_response(&self) -> bool {
        !matches!(self, RegisterRequest::Disconnect)
    }

    /// Encode the request into a new byte vector.
    ///
    /// # Example
    ///
    /// ```
    /// use qfprom_client::protocol::{ReadType, RegisterRequest};
    ///
    /// let req = RegisterRequest::Read { address: 0x1000, read_type: ReadType::Raw };
    /// assert_eq!(req.encode(), [0x01, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    /// ```
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = [0u8; MAX_REQUEST_SIZE];
        let len = self.encode_into(&mut buf);
        buf[..len].to_vec()
    }

    /// Encode the request into an existing buffer, returning the frame length.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than [`encoded_len`](Self::encoded_len).
    pub fn encode_into(&self, buf: &mut [u8]) -> usize {
        let len = self.encoded_len();
        assert!(buf.len() >= len, "buffer too small for request frame");

        buf[0] = self.opcode();
        match *self {
            RegisterRequest::Read { address, read_type } => {
                buf[1..5].copy_from_slice(&address.to_le_bytes());
                buf[5..9].copy_from_slice(&read_type.wire_value().to_le_bytes());
            }
            RegisterRequest::ReadDirect { address } => {
                buf[1..5].copy_from_slice(&address.to_le_bytes());
                buf[5..9].copy_from_slice(&0u32.to_le_bytes());
            }
            RegisterRequest::Write {
                address,
                bus_clock_khz,
                lsb,
                msb,
            } => {
                buf[1..5].copy_from_slice(&address.to_le_bytes());
                buf[5..9].copy_from_slice(&bus_clock_khz.to_le_bytes());
                buf[9..13].copy_from_slice(&lsb.to_le_bytes());
                buf[13..17].copy_from_slice(&msb.to_le_bytes());
            }
            RegisterRequest::Disconnect => {}
        }
        len
    }
}
