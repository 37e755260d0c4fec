//! Client builder and register exchange.
//!
//! The [`ClientBuilder`] collects transport settings and opens the
//! connection. The [`RegisterClient`] then runs one synchronous exchange per
//! register operation:
//! 1. Encode the request frame
//! 2. Write the whole frame and flush
//! 3. Accumulate exactly 21 response bytes
//! 4. Decode into a [`RegisterResult`]
//!
//! # Example
//!
//! ```ignore
//! use qfprom_client::{ReadType, RegisterClient};
//!
//! #[tokio::main]
//! async fn main() -> qfprom_client::Result<()> {
//!     let mut client = RegisterClient::builder()
//!         .read_timeout(std::time::Duration::from_secs(2))
//!         .connect("192.168.1.20:5000")
//!         .await?;
//!
//!     let result = client.read_register(0xFC4B_80A8, ReadType::Corrected).await?;
//!     println!("{:?}", result);
//!
//!     client.close().await
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::{QfpromError, Result};
use crate::protocol::{
    ReadType, RegisterRequest, RegisterResponse, ResponseBuffer, MAX_REQUEST_SIZE, RESPONSE_SIZE,
};
use crate::register::RegisterResult;
use crate::transport::{self, DEFAULT_CONNECT_TIMEOUT};

/// Transport settings for a register client.
///
/// The fuse service defines no timeouts of its own, so any bound on a
/// blocking step is applied here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Limit on the TCP connect. Default: 5 seconds.
    pub connect_timeout: Option<Duration>,
    /// Limit on receiving one full response. Default: none.
    pub read_timeout: Option<Duration>,
    /// Limit on sending one full request. Default: none.
    pub write_timeout: Option<Duration>,
    /// Disable Nagle's algorithm on TCP connections. Default: true.
    pub nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            read_timeout: None,
            write_timeout: None,
            nodelay: true,
        }
    }
}

/// Builder for configuring and connecting a [`RegisterClient`].
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a new client builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout. `None` waits as long as the OS does.
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the per-response read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = Some(timeout);
        self
    }

    /// Set the per-request write timeout.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = Some(timeout);
        self
    }

    /// Enable or disable `TCP_NODELAY`.
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connect to the service over TCP.
    pub async fn connect<A: ToSocketAddrs>(self, addr: A) -> Result<RegisterClient<TcpStream>> {
        let stream =
            transport::connect(addr, self.config.connect_timeout, self.config.nodelay).await?;
        Ok(RegisterClient::with_config(stream, self.config))
    }

    /// Wrap an already established stream.
    pub fn with_stream<S>(self, stream: S) -> RegisterClient<S>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        RegisterClient::with_config(stream, self.config)
    }
}

/// Where the connection stands in the request/response alternation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// No outstanding response; a request may be sent.
    Idle,
    /// A request went out and its response has not been fully read.
    AwaitingResponse,
    /// The disconnect frame was sent.
    Disconnected,
}

/// Client for one connection to the fuse service.
///
/// Methods take `&mut self`: exchanges on one connection never overlap.
pub struct RegisterClient<S = TcpStream> {
    stream: S,
    config: ClientConfig,
    state: SessionState,
    buffer: ResponseBuffer,
}

impl RegisterClient<TcpStream> {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Connect with default settings.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        ClientBuilder::new().connect(addr).await
    }
}

impl<S> RegisterClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream with default settings.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, ClientConfig::default())
    }

    /// Wrap a connected stream with the given settings.
    pub fn with_config(stream: S, config: ClientConfig) -> Self {
        Self {
            stream,
            config,
            state: SessionState::Idle,
            buffer: ResponseBuffer::new(),
        }
    }

    /// Read one fuse row.
    pub async fn read_register(
        &mut self,
        address: u32,
        read_type: ReadType,
    ) -> Result<RegisterResult> {
        let response = self
            .exchange(RegisterRequest::Read { address, read_type })
            .await?;
        Ok(response.into_result())
    }

    /// Blow a fuse row with the given value halves.
    pub async fn write_register(
        &mut self,
        address: u32,
        lsb: u32,
        msb: u32,
        bus_clock_khz: u32,
    ) -> Result<RegisterResult> {
        let response = self
            .exchange(RegisterRequest::Write {
                address,
                bus_clock_khz,
                lsb,
                msb,
            })
            .await?;
        Ok(response.into_result())
    }

    /// Read one row from the memory-mapped fuse region.
    pub async fn read_direct(&mut self, address: u32) -> Result<RegisterResult> {
        let response = self
            .exchange(RegisterRequest::ReadDirect { address })
            .await?;
        Ok(response.into_result())
    }

    /// Read several rows in order.
    ///
    /// Device rejections are collected like any other result. The first
    /// transport or protocol error aborts the sequence.
    pub async fn read_many<I>(
        &mut self,
        addresses: I,
        read_type: ReadType,
    ) -> Result<Vec<RegisterResult>>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut results = Vec::new();
        for address in addresses {
            results.push(self.read_register(address, read_type).await?);
        }
        Ok(results)
    }

    /// Send one request and wait for its response frame.
    ///
    /// Returns the raw decoded frame, including the opaque `read_type` word.
    /// Use [`disconnect`](Self::disconnect) for the disconnect frame.
    pub async fn exchange(&mut self, request: RegisterRequest) -> Result<RegisterResponse> {
        match self.state {
            SessionState::Idle => {}
            SessionState::AwaitingResponse => return Err(QfpromError::Desynchronized),
            SessionState::Disconnected => return Err(QfpromError::SessionClosed),
        }

        if !request.expects_response() {
            return Err(QfpromError::Protocol(
                "Disconnect has no response, use disconnect()".to_string(),
            ));
        }

        // Stays set if anything below fails or the future is dropped.
        self.state = SessionState::AwaitingResponse;

        self.send(&request).await?;
        let response = self.receive().await?;

        self.state = SessionState::Idle;

        if response.command != request.opcode() || Some(response.address) != request.address() {
            tracing::warn!(
                "Response (command {:#04x}, address 0x{:08X}) does not echo request {:?}",
                response.command,
                response.address,
                request
            );
        }

        tracing::debug!(
            "Exchange for 0x{:08X}: lsb=0x{:08X} msb=0x{:08X} error={}",
            response.address,
            response.lsb,
            response.msb,
            response.error
        );

        Ok(response)
    }

    /// Send the single-byte disconnect frame.
    ///
    /// No response is awaited. Calling it again is a no-op. The transport is
    /// left open; use [`close`](Self::close) to also shut it down.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.state == SessionState::Disconnected {
            return Ok(());
        }

        self.send(&RegisterRequest::Disconnect).await?;
        self.state = SessionState::Disconnected;

        tracing::debug!("Sent disconnect");
        Ok(())
    }

    /// Disconnect (if not done yet) and shut the transport down.
    pub async fn close(mut self) -> Result<()> {
        self.disconnect().await?;
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Whether a new request may be sent.
    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    /// Whether the disconnect frame was sent.
    pub fn is_disconnected(&self) -> bool {
        self.state == SessionState::Disconnected
    }

    /// Settings this client was created with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Take the underlying stream back without disconnecting.
    pub fn into_inner(self) -> S {
        self.stream
    }

    async fn send(&mut self, request: &RegisterRequest) -> Result<()> {
        let mut frame = [0u8; MAX_REQUEST_SIZE];
        let len = request.encode_into(&mut frame);
        tracing::trace!("Request  [{}]", Hex(&frame[..len]));

        with_timeout(
            self.config.write_timeout,
            "sending request",
            write_frame(&mut self.stream, &frame[..len]),
        )
        .await
    }

    async fn receive(&mut self) -> Result<RegisterResponse> {
        self.buffer.clear();

        let response = with_timeout(
            self.config.read_timeout,
            "reading response",
            read_frame(&mut self.stream, &mut self.buffer),
        )
        .await?;

        tracing::trace!("Response [{}]", Hex(&response.encode()));
        Ok(response)
    }
}

async fn write_frame<W: AsyncWrite + Unpin>(stream: &mut W, frame: &[u8]) -> Result<()> {
    stream.write_all(frame).await?;
    stream.flush().await?;
    Ok(())
}

/// Accumulate exactly one response frame.
async fn read_frame<R: AsyncRead + Unpin>(
    stream: &mut R,
    buffer: &mut ResponseBuffer,
) -> Result<RegisterResponse> {
    let mut chunk = [0u8; RESPONSE_SIZE];
    loop {
        // Never read past the current frame.
        let want = buffer.remaining();
        let n = stream.read(&mut chunk[..want]).await?;
        if n == 0 {
            return Err(QfpromError::ConnectionClosed {
                received: buffer.len(),
                expected: RESPONSE_SIZE,
            });
        }
        if let Some(response) = buffer.push(&chunk[..n])? {
            return Ok(response);
        }
    }
}

async fn with_timeout<F, T>(timeout: Option<Duration>, operation: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| QfpromError::Timeout { operation, after })?,
        None => fut.await,
    }
}

/// Lazily formatted hex dump for trace logs.
struct Hex<'a>(&'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
