//! Network transport layer
//!
//! Supplies the byte-stream primitives the protocol layer is built on: a
//! buffered send, a single bounded receive, and asynchronous connection-state
//! notifications. The [`ModbusTransport`] trait is the seam for tests and for
//! carrying the protocol over transports other than plain TCP.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::error::{ModbusError, ModbusResult};

/// Connection lifecycle states reported by a transport.
///
/// Transitions are forwarded to the registered callback verbatim and in
/// order, one notification per transition. Transport signals outside the
/// recognized set map to [`ConnectionState::Unknown`] instead of being
/// silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connection attempt in progress
    Preparing,
    /// Connected and ready for an exchange
    Ready,
    /// Waiting for the peer (reconnect backoff, remote busy)
    Waiting,
    /// Connection attempt or established connection failed
    Failed,
    /// Connection closed locally
    Cancelled,
    /// Any transport-reported state not otherwise recognized
    Unknown,
}

impl ConnectionState {
    /// Map a transport-reported state label to a [`ConnectionState`].
    ///
    /// Used when bridging transports that report their state as strings;
    /// anything unrecognized becomes [`ConnectionState::Unknown`].
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "preparing" => Self::Preparing,
            "ready" => Self::Ready,
            "waiting" => Self::Waiting,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Waiting => "waiting",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// Callback invoked for every connection-state transition.
pub type StateCallback = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Transport statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Requests sent
    pub requests_sent: u64,
    /// Responses received
    pub responses_received: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Total bytes received
    pub bytes_received: u64,
    /// Send/receive errors
    pub errors: u64,
}

/// Byte-stream transport primitives required by the protocol layer.
///
/// `send` must be idempotent at the protocol level: re-sending identical
/// bytes does not corrupt protocol state. `receive` issues exactly one
/// bounded read; reassembly of responses split across reads is out of scope.
pub trait ModbusTransport: Send {
    /// Send a complete request frame.
    fn send(&mut self, frame: &[u8]) -> impl std::future::Future<Output = ModbusResult<()>> + Send;

    /// Receive one chunk of response bytes.
    ///
    /// Reads at most `max_len` bytes in a single operation. A read yielding
    /// fewer than `min_len` bytes (including EOF) is a transport error.
    fn receive(
        &mut self,
        min_len: usize,
        max_len: usize,
    ) -> impl std::future::Future<Output = ModbusResult<Vec<u8>>> + Send;

    /// Whether the transport is connected.
    fn is_connected(&self) -> bool;

    /// Close the transport.
    fn close(&mut self) -> impl std::future::Future<Output = ModbusResult<()>> + Send;

    /// Get transport statistics.
    fn get_stats(&self) -> TransportStats;
}

/// TCP transport for Modbus communication.
///
/// No deadline is enforced on individual exchanges; a request that never
/// receives a response stays pending until the caller imposes its own
/// timeout or closes the connection. Only the initial connect is bounded.
pub struct TcpTransport {
    /// Remote server address
    pub address: SocketAddr,
    stream: Option<TcpStream>,
    stats: TransportStats,
    on_state: Option<StateCallback>,
}

impl TcpTransport {
    /// Connect to a Modbus server.
    pub async fn new(address: SocketAddr, connect_timeout: Duration) -> ModbusResult<Self> {
        Self::connect(address, connect_timeout, None).await
    }

    /// Connect to a Modbus server with connection-state notifications.
    ///
    /// The callback sees `Preparing` before the dial and then `Ready` or
    /// `Failed`; `Cancelled` is reported when the transport is closed.
    pub async fn connect(
        address: SocketAddr,
        connect_timeout: Duration,
        on_state: Option<StateCallback>,
    ) -> ModbusResult<Self> {
        notify(&on_state, ConnectionState::Preparing);

        let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect(address)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                notify(&on_state, ConnectionState::Failed);
                return Err(ModbusError::transport(format!(
                    "connect to {} failed: {}",
                    address, err
                )));
            }
            Err(_) => {
                notify(&on_state, ConnectionState::Failed);
                return Err(ModbusError::transport(format!(
                    "connect to {} timed out after {:?}",
                    address, connect_timeout
                )));
            }
        };

        stream.set_nodelay(true).ok();
        info!("connected to {}", address);
        notify(&on_state, ConnectionState::Ready);

        Ok(Self {
            address,
            stream: Some(stream),
            stats: TransportStats::default(),
            on_state,
        })
    }

    fn stream_mut(&mut self) -> ModbusResult<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| ModbusError::transport("not connected"))
    }
}

impl ModbusTransport for TcpTransport {
    async fn send(&mut self, frame: &[u8]) -> ModbusResult<()> {
        let stream = self.stream_mut()?;

        if let Err(err) = async {
            stream.write_all(frame).await?;
            stream.flush().await
        }
        .await
        {
            self.stats.errors += 1;
            return Err(ModbusError::transport(format!("send failed: {}", err)));
        }

        self.stats.requests_sent += 1;
        self.stats.bytes_sent += frame.len() as u64;
        debug!("sent {} bytes to {}", frame.len(), self.address);
        Ok(())
    }

    async fn receive(&mut self, min_len: usize, max_len: usize) -> ModbusResult<Vec<u8>> {
        let stream = self.stream_mut()?;

        // Limit the writable region so a single read can never exceed
        // max_len, independent of the buffer's actual capacity
        let mut buf = BytesMut::with_capacity(max_len);
        let n = match stream.read_buf(&mut (&mut buf).limit(max_len)).await {
            Ok(n) => n,
            Err(err) => {
                self.stats.errors += 1;
                return Err(ModbusError::transport(format!("receive failed: {}", err)));
            }
        };

        if n == 0 {
            self.stats.errors += 1;
            warn!("connection to {} closed by peer", self.address);
            return Err(ModbusError::transport("connection closed by peer"));
        }
        if n < min_len {
            self.stats.errors += 1;
            return Err(ModbusError::transport(format!(
                "short read: {} bytes, need at least {}",
                n, min_len
            )));
        }

        self.stats.responses_received += 1;
        self.stats.bytes_received += n as u64;
        debug!("received {} bytes from {}", n, self.address);
        Ok(buf.to_vec())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn close(&mut self) -> ModbusResult<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await.ok();
            info!("closed connection to {}", self.address);
            notify(&self.on_state, ConnectionState::Cancelled);
        }
        Ok(())
    }

    fn get_stats(&self) -> TransportStats {
        self.stats
    }
}

fn notify(on_state: &Option<StateCallback>, state: ConnectionState) {
    if let Some(callback) = on_state {
        debug!("connection state: {}", state);
        callback(state);
    }
}
