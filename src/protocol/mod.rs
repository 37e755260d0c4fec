//! Protocol module - wire format, response decoding, and buffering.
//!
//! This module implements the binary exchange with the fuse service:
//! - 9/17/1-byte request encoding
//! - 21-byte response decoding
//! - Response buffer for accumulating partial reads

mod frame_buffer;
mod response;
mod wire_format;

pub use frame_buffer::ResponseBuffer;
pub use response::RegisterResponse;
pub use wire_format::{
    opcode, ReadType, RegisterRequest, DISCONNECT_REQUEST_SIZE, MAX_REQUEST_SIZE,
    READ_REQUEST_SIZE, RESPONSE_SIZE, WRITE_REQUEST_SIZE,
};
