//! High-level Modbus client implementations
//!
//! The client facade owns a transport and a [`FramingMode`] fixed at
//! construction, and sequences each operation as build request, send, one
//! bounded receive, validate, deliver result. Methods take `&mut self`, so
//! at most one logical exchange can be outstanding per client instance;
//! callers wanting concurrency run one client per connection.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use modbus_link::{FramingMode, ModbusClient, ModbusTcpClient, ModbusResult};
//!
//! #[tokio::main]
//! async fn main() -> ModbusResult<()> {
//!     let mut client =
//!         ModbusTcpClient::from_address("127.0.0.1:502", FramingMode::Tcp).await?;
//!
//!     // Read 10 holding registers from unit 1, starting at address 0
//!     let registers = client.read_holding_registers(1, 0, 10).await?;
//!     println!("registers: {:?}", registers);
//!
//!     // Write two registers starting at address 100
//!     client.write_holding_registers(1, 100, &[0x1234, 0x5678]).await?;
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use tracing::debug;

use crate::constants::{MAX_READ_REGISTERS, RESPONSE_MAX_LEN, RESPONSE_MIN_LEN};
use crate::error::{ModbusError, ModbusResult};
use crate::frame::FramingMode;
use crate::transport::{ModbusTransport, StateCallback, TcpTransport, TransportStats};

/// Interface for Modbus register-access operations.
///
/// Implemented by [`GenericModbusClient`] for any transport and by
/// [`ModbusTcpClient`] for plain TCP connections.
pub trait ModbusClient: Send {
    /// Read holding registers (function code 0x03).
    ///
    /// # Arguments
    ///
    /// * `unit_id` - The Modbus unit/slave id ([`crate::DEFAULT_UNIT_ID`] for most devices)
    /// * `address` - Starting register address (0-65535)
    /// * `count` - Number of registers to read (0-125)
    ///
    /// # Returns
    ///
    /// Register values in ascending address order; `count = 0` yields an
    /// empty vector, not an error.
    fn read_holding_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> impl std::future::Future<Output = ModbusResult<Vec<u16>>> + Send;

    /// Write multiple holding registers (function code 0x10).
    ///
    /// FC16 is used regardless of register count, including a single value.
    ///
    /// # Arguments
    ///
    /// * `unit_id` - The Modbus unit/slave id
    /// * `address` - Starting register address (0-65535)
    /// * `values` - Values to write (1-127 registers)
    fn write_holding_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        values: &[u16],
    ) -> impl std::future::Future<Output = ModbusResult<()>> + Send;

    /// Check if the client is connected.
    fn is_connected(&self) -> bool;

    /// Close the client connection.
    fn close(&mut self) -> impl std::future::Future<Output = ModbusResult<()>> + Send;

    /// Get transport statistics.
    fn get_stats(&self) -> TransportStats;
}

/// Generic Modbus client that works with any transport.
///
/// Both framings share the request/response sequencing; only the envelope
/// differs, and that lives in [`FramingMode`]. A failed exchange (malformed
/// frame, CRC error, device exception) does not poison the client: the next
/// operation proceeds on the same connection.
pub struct GenericModbusClient<T: ModbusTransport> {
    transport: T,
    framing: FramingMode,
}

impl<T: ModbusTransport> GenericModbusClient<T> {
    /// Create a client over an existing transport.
    pub fn new(transport: T, framing: FramingMode) -> Self {
        Self { transport, framing }
    }

    /// The framing mode this client was created with.
    pub fn framing(&self) -> FramingMode {
        self.framing
    }

    /// Get a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send a request frame and collect one bounded response.
    async fn exchange(&mut self, request: &[u8]) -> ModbusResult<Vec<u8>> {
        self.transport.send(request).await?;
        self.transport
            .receive(RESPONSE_MIN_LEN, RESPONSE_MAX_LEN)
            .await
    }
}

impl<T: ModbusTransport + Send> ModbusClient for GenericModbusClient<T> {
    async fn read_holding_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> ModbusResult<Vec<u16>> {
        if count as usize > MAX_READ_REGISTERS {
            return Err(ModbusError::invalid_request(format!(
                "read of {} registers exceeds limit of {}",
                count, MAX_READ_REGISTERS
            )));
        }

        debug!(
            "read_holding_registers: unit={}, address={}, count={}",
            unit_id, address, count
        );
        let request = self.framing.build_read_request(unit_id, address, count);
        let response = self.exchange(&request).await?;
        self.framing.decode_read_response(&response)
    }

    async fn write_holding_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        values: &[u16],
    ) -> ModbusResult<()> {
        debug!(
            "write_holding_registers: unit={}, address={}, count={}",
            unit_id,
            address,
            values.len()
        );
        let request = self.framing.build_write_request(unit_id, address, values)?;
        let response = self.exchange(&request).await?;
        self.framing.check_write_ack(&response)
    }

    fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    async fn close(&mut self) -> ModbusResult<()> {
        self.transport.close().await
    }

    fn get_stats(&self) -> TransportStats {
        self.transport.get_stats()
    }
}

/// Modbus client over a TCP connection.
///
/// Supports both framings: [`FramingMode::Tcp`] for standard Modbus TCP
/// servers and [`FramingMode::RtuOverTcp`] for serial gateways that expect
/// RTU frames on the socket.
pub struct ModbusTcpClient {
    inner: GenericModbusClient<TcpTransport>,
}

impl ModbusTcpClient {
    /// Connect to a Modbus server.
    pub async fn new(
        addr: SocketAddr,
        framing: FramingMode,
        connect_timeout: Duration,
    ) -> ModbusResult<Self> {
        let transport = TcpTransport::new(addr, connect_timeout).await?;
        Ok(Self {
            inner: GenericModbusClient::new(transport, framing),
        })
    }

    /// Connect with connection-state notifications.
    ///
    /// Every state transition the transport reports is forwarded to
    /// `on_state` verbatim and in order, independent of any pending exchange.
    pub async fn connect(
        host: &str,
        port: u16,
        framing: FramingMode,
        on_state: Option<StateCallback>,
    ) -> ModbusResult<Self> {
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| ModbusError::configuration(format!("invalid address: {}", e)))?;
        let timeout = Duration::from_millis(crate::DEFAULT_CONNECT_TIMEOUT_MS);
        let transport = TcpTransport::connect(addr, timeout, on_state).await?;
        Ok(Self {
            inner: GenericModbusClient::new(transport, framing),
        })
    }

    /// Connect using an `address:port` string and the default timeout.
    pub async fn from_address(addr: &str, framing: FramingMode) -> ModbusResult<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| ModbusError::configuration(format!("invalid address: {}", e)))?;
        Self::new(
            addr,
            framing,
            Duration::from_millis(crate::DEFAULT_CONNECT_TIMEOUT_MS),
        )
        .await
    }

    /// Create a client from an already-connected transport.
    pub fn from_transport(transport: TcpTransport, framing: FramingMode) -> Self {
        Self {
            inner: GenericModbusClient::new(transport, framing),
        }
    }

    /// The server address this client is connected to.
    pub fn server_address(&self) -> SocketAddr {
        self.inner.transport().address
    }
}

impl ModbusClient for ModbusTcpClient {
    async fn read_holding_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        count: u16,
    ) -> ModbusResult<Vec<u16>> {
        self.inner.read_holding_registers(unit_id, address, count).await
    }

    async fn write_holding_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        values: &[u16],
    ) -> ModbusResult<()> {
        self.inner.write_holding_registers(unit_id, address, values).await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    async fn close(&mut self) -> ModbusResult<()> {
        self.inner.close().await
    }

    fn get_stats(&self) -> TransportStats {
        self.inner.get_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::append_crc;
    use crate::frame::encode_registers;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    // =========================================================================
    // MockTransport for facade tests
    // =========================================================================

    /// Mock transport recording sent frames and replaying queued responses.
    struct MockTransport {
        sent: Mutex<Vec<Vec<u8>>>,
        responses: Mutex<VecDeque<ModbusResult<Vec<u8>>>>,
        connected: Mutex<bool>,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                responses: Mutex::new(VecDeque::new()),
                connected: Mutex::new(true),
            }
        }

        fn queue_response(&self, response: ModbusResult<Vec<u8>>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn sent_frames(&self) -> Vec<Vec<u8>> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl ModbusTransport for MockTransport {
        async fn send(&mut self, frame: &[u8]) -> ModbusResult<()> {
            self.sent.lock().unwrap().push(frame.to_vec());
            Ok(())
        }

        async fn receive(&mut self, min_len: usize, max_len: usize) -> ModbusResult<Vec<u8>> {
            assert_eq!(min_len, RESPONSE_MIN_LEN);
            assert_eq!(max_len, RESPONSE_MAX_LEN);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ModbusError::transport("no response prepared in mock")))
        }

        fn is_connected(&self) -> bool {
            *self.connected.lock().unwrap()
        }

        async fn close(&mut self) -> ModbusResult<()> {
            *self.connected.lock().unwrap() = false;
            Ok(())
        }

        fn get_stats(&self) -> TransportStats {
            TransportStats::default()
        }
    }

    // =========================================================================
    // Response frame helpers
    // =========================================================================

    fn tcp_read_response(unit_id: u8, values: &[u16]) -> Vec<u8> {
        let byte_count = values.len() * 2;
        let mut frame = vec![0, 0, 0, 0];
        frame.extend_from_slice(&((3 + byte_count) as u16).to_be_bytes());
        frame.push(unit_id);
        frame.push(0x03);
        frame.push(byte_count as u8);
        frame.extend_from_slice(&encode_registers(values));
        frame
    }

    fn rtu_read_response(unit_id: u8, values: &[u16]) -> Vec<u8> {
        let mut frame = vec![unit_id, 0x03, (values.len() * 2) as u8];
        frame.extend_from_slice(&encode_registers(values));
        append_crc(&mut frame);
        frame
    }

    fn tcp_write_ack(unit_id: u8, address: u16, count: u16) -> Vec<u8> {
        let mut frame = vec![0, 0, 0, 0, 0, 6, unit_id, 0x10];
        frame.extend_from_slice(&address.to_be_bytes());
        frame.extend_from_slice(&count.to_be_bytes());
        frame
    }

    fn rtu_write_ack(unit_id: u8, address: u16, count: u16) -> Vec<u8> {
        let mut frame = vec![unit_id, 0x10];
        frame.extend_from_slice(&address.to_be_bytes());
        frame.extend_from_slice(&count.to_be_bytes());
        append_crc(&mut frame);
        frame
    }

    // =========================================================================
    // Read path
    // =========================================================================

    #[tokio::test]
    async fn test_read_roundtrip_tcp() {
        let mock = MockTransport::new();
        mock.queue_response(Ok(tcp_read_response(1, &[0x1234, 0x5678, 0x9ABC])));

        let mut client = GenericModbusClient::new(mock, FramingMode::Tcp);
        let registers = client.read_holding_registers(1, 0x0010, 3).await.unwrap();
        assert_eq!(registers, vec![0x1234, 0x5678, 0x9ABC]);

        let sent = client.transport().sent_frames();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            vec![0, 0, 0, 0, 0, 6, 0x01, 0x03, 0x00, 0x10, 0x00, 0x03]
        );
    }

    #[tokio::test]
    async fn test_read_roundtrip_rtu() {
        let mock = MockTransport::new();
        mock.queue_response(Ok(rtu_read_response(7, &[0xCAFE])));

        let mut client = GenericModbusClient::new(mock, FramingMode::RtuOverTcp);
        let registers = client.read_holding_registers(7, 0, 1).await.unwrap();
        assert_eq!(registers, vec![0xCAFE]);

        let sent = client.transport().sent_frames();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0][..2], [0x07, 0x03]);
        assert_eq!(sent[0].len(), 8);
    }

    #[tokio::test]
    async fn test_read_zero_count() {
        let mock = MockTransport::new();
        mock.queue_response(Ok(tcp_read_response(1, &[])));

        let mut client = GenericModbusClient::new(mock, FramingMode::Tcp);
        let registers = client.read_holding_registers(1, 0, 0).await.unwrap();
        assert!(registers.is_empty());
    }

    #[tokio::test]
    async fn test_read_max_count_roundtrip_tcp() {
        // The largest permitted read produces a 259-byte response, which
        // must fit the single bounded receive
        let values: Vec<u16> = (0..MAX_READ_REGISTERS as u16).collect();
        let response = tcp_read_response(1, &values);
        assert_eq!(response.len(), 259);
        assert!(response.len() <= RESPONSE_MAX_LEN);

        let mock = MockTransport::new();
        mock.queue_response(Ok(response));

        let mut client = GenericModbusClient::new(mock, FramingMode::Tcp);
        let registers = client
            .read_holding_registers(1, 0, MAX_READ_REGISTERS as u16)
            .await
            .unwrap();
        assert_eq!(registers, values);
    }

    #[tokio::test]
    async fn test_read_count_over_limit_rejected_before_send() {
        let mock = MockTransport::new();
        let mut client = GenericModbusClient::new(mock, FramingMode::Tcp);

        let result = client.read_holding_registers(1, 0, 126).await;
        assert!(matches!(result, Err(ModbusError::InvalidRequest { .. })));
        assert!(client.transport().sent_frames().is_empty());
    }

    #[tokio::test]
    async fn test_read_transport_failure_surfaces_kind() {
        let mock = MockTransport::new();
        mock.queue_response(Err(ModbusError::transport("connection reset")));

        let mut client = GenericModbusClient::new(mock, FramingMode::Tcp);
        let result = client.read_holding_registers(1, 0, 1).await;
        assert!(matches!(result, Err(ModbusError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_read_device_exception_surfaces_code() {
        let mut frame = vec![0x01, 0x83, 0x02];
        append_crc(&mut frame);

        let mock = MockTransport::new();
        mock.queue_response(Ok(frame));

        let mut client = GenericModbusClient::new(mock, FramingMode::RtuOverTcp);
        match client.read_holding_registers(1, 0, 1).await {
            Err(ModbusError::Exception { function, code }) => {
                assert_eq!(function, 0x03);
                assert_eq!(code, 0x02);
            }
            other => panic!("expected exception, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_exchange_leaves_client_usable() {
        let mock = MockTransport::new();
        // First response is garbage, second is valid
        mock.queue_response(Ok(vec![0x00, 0x01]));
        mock.queue_response(Ok(tcp_read_response(1, &[0x0042])));

        let mut client = GenericModbusClient::new(mock, FramingMode::Tcp);
        assert!(client.read_holding_registers(1, 0, 1).await.is_err());

        let registers = client.read_holding_registers(1, 0, 1).await.unwrap();
        assert_eq!(registers, vec![0x0042]);
        assert!(client.is_connected());
    }

    // =========================================================================
    // Write path
    // =========================================================================

    #[tokio::test]
    async fn test_write_roundtrip_tcp() {
        let mock = MockTransport::new();
        mock.queue_response(Ok(tcp_write_ack(1, 0x0010, 2)));

        let mut client = GenericModbusClient::new(mock, FramingMode::Tcp);
        client
            .write_holding_registers(1, 0x0010, &[0x1234, 0x5678])
            .await
            .unwrap();

        let sent = client.transport().sent_frames();
        assert_eq!(
            sent[0],
            vec![
                0, 0, 0, 0, 0, 11, 0x01, 0x10, 0x00, 0x10, 0x00, 0x02, 0x04, 0x12, 0x34, 0x56,
                0x78
            ]
        );
    }

    #[tokio::test]
    async fn test_write_roundtrip_rtu() {
        let mock = MockTransport::new();
        mock.queue_response(Ok(rtu_write_ack(1, 0x0010, 2)));

        let mut client = GenericModbusClient::new(mock, FramingMode::RtuOverTcp);
        client
            .write_holding_registers(1, 0x0010, &[0x1234, 0x5678])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_write_bad_ack_function_code() {
        let mut ack = tcp_write_ack(1, 0, 1);
        ack[7] = 0x03;

        let mock = MockTransport::new();
        mock.queue_response(Ok(ack));

        let mut client = GenericModbusClient::new(mock, FramingMode::Tcp);
        let result = client.write_holding_registers(1, 0, &[1]).await;
        assert!(matches!(result, Err(ModbusError::AckMismatch { .. })));
    }

    #[tokio::test]
    async fn test_write_corrupted_rtu_ack() {
        let mut ack = rtu_write_ack(1, 0, 1);
        ack[2] ^= 0x01;

        let mock = MockTransport::new();
        mock.queue_response(Ok(ack));

        let mut client = GenericModbusClient::new(mock, FramingMode::RtuOverTcp);
        let result = client.write_holding_registers(1, 0, &[1]).await;
        assert!(matches!(result, Err(ModbusError::CrcMismatch { .. })));
    }

    #[tokio::test]
    async fn test_write_oversize_rejected_before_send() {
        let mock = MockTransport::new();
        let mut client = GenericModbusClient::new(mock, FramingMode::Tcp);

        let values = vec![0u16; 128];
        let result = client.write_holding_registers(1, 0, &values).await;
        assert!(matches!(result, Err(ModbusError::InvalidRequest { .. })));
        assert!(client.transport().sent_frames().is_empty());
    }

    // =========================================================================
    // Live socket end-to-end
    // =========================================================================

    #[tokio::test]
    async fn test_tcp_client_against_local_server() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let n = socket.read(&mut buf).await.unwrap();
            // FC03 request for 2 registers at address 5, unit 1
            assert_eq!(
                &buf[..n],
                &[0, 0, 0, 0, 0, 6, 0x01, 0x03, 0x00, 0x05, 0x00, 0x02]
            );
            socket
                .write_all(&[0, 0, 0, 0, 0, 7, 0x01, 0x03, 0x04, 0x00, 0x2A, 0x00, 0x2B])
                .await
                .unwrap();
        });

        let mut client = ModbusTcpClient::new(
            addr,
            FramingMode::Tcp,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        let registers = client.read_holding_registers(1, 5, 2).await.unwrap();
        assert_eq!(registers, vec![0x002A, 0x002B]);
        assert_eq!(client.server_address(), addr);

        server.await.unwrap();
        client.close().await.unwrap();
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_tcp_client_reads_max_count_from_local_server() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let values: Vec<u16> = (0..MAX_READ_REGISTERS as u16).collect();
        let response = tcp_read_response(1, &values);

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            socket.read(&mut buf).await.unwrap();
            socket.write_all(&response).await.unwrap();
        });

        let mut client = ModbusTcpClient::new(addr, FramingMode::Tcp, Duration::from_secs(1))
            .await
            .unwrap();

        let registers = client
            .read_holding_registers(1, 0, MAX_READ_REGISTERS as u16)
            .await
            .unwrap();
        assert_eq!(registers, values);

        server.await.unwrap();
        client.close().await.unwrap();
    }
}
