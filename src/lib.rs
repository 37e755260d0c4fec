//! # qfprom-client
//!
//! Rust client for the QFPROM fuse-register TCP service.
//!
//! The service runs inside a kernel module on the target device and exposes
//! fuse rows over a plain TCP port. Each row operation is one synchronous
//! exchange of fixed-size little-endian frames.
//!
//! ## Architecture
//!
//! - **Protocol**: 9/17/1-byte request frames, 21-byte response frame
//! - **Client**: one half-duplex exchange at a time per connection
//! - **Report**: text or JSON-lines rendering for the CLI
//!
//! ## Example
//!
//! ```ignore
//! use qfprom_client::{ReadType, RegisterClient};
//!
//! #[tokio::main]
//! async fn main() -> qfprom_client::Result<()> {
//!     let mut client = RegisterClient::connect("192.168.1.20:5000").await?;
//!
//!     match client.read_register(0xFC4B_80A8, ReadType::Raw).await? {
//!         qfprom_client::RegisterResult::Row(row) => println!("{:#018x}", row.value()),
//!         qfprom_client::RegisterResult::Rejected(err) => println!("error {}", err.code),
//!     }
//!
//!     client.close().await
//! }
//! ```

pub mod error;
pub mod parse;
pub mod protocol;
pub mod register;
pub mod report;
pub mod transport;

mod client;

pub use client::{ClientBuilder, ClientConfig, RegisterClient};
pub use error::{QfpromError, Result};
pub use protocol::{ReadType, RegisterRequest, RegisterResponse};
pub use register::{DeviceError, RegisterResult, RegisterRow};
