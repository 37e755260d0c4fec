//! TCP connection to the fuse service.
//!
//! # Example
//!
//! ```ignore
//! use qfprom_client::transport::{connect, DEFAULT_CONNECT_TIMEOUT};
//!
//! let stream = connect("192.168.1.20:5000", Some(DEFAULT_CONNECT_TIMEOUT), true).await?;
//! ```

use std::time::Duration;

use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::{QfpromError, Result};

/// Default time allowed for the TCP handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a TCP connection to the service.
///
/// `timeout` bounds the whole connect, including name resolution. With
/// `nodelay` set, small request frames go out without Nagle batching.
pub async fn connect<A: ToSocketAddrs>(
    addr: A,
    timeout: Option<Duration>,
    nodelay: bool,
) -> Result<TcpStream> {
    let stream = match timeout {
        Some(after) => tokio::time::timeout(after, TcpStream::connect(addr))
            .await
            .map_err(|_| QfpromError::Timeout {
                operation: "connecting",
                after,
            })??,
        None => TcpStream::connect(addr).await?,
    };

    stream.set_nodelay(nodelay)?;

    if let Ok(peer) = stream.peer_addr() {
        tracing::debug!("Connected to fuse service at {}", peer);
    }

    Ok(stream)
}
