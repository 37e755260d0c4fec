//! Transport module - TCP connection setup.
//!
//! The fuse service listens on a plain TCP port. The exchange client itself
//! is generic over any `AsyncRead + AsyncWrite` stream; this module only
//! opens the default one.

mod tcp;

pub use tcp::{connect, DEFAULT_CONNECT_TIMEOUT};
