//! # Modbus Link - Modbus TCP / RTU-over-TCP Client
//!
//! A client-side implementation of the Modbus register-access protocol over
//! TCP, supporting two wire framings on the same byte stream:
//!
//! | Framing | Envelope | Integrity |
//! |---------|----------|-----------|
//! | [`FramingMode::Tcp`] | MBAP header | length field |
//! | [`FramingMode::RtuOverTcp`] | none | CRC-16 trailer |
//!
//! The crate covers the protocol layer: length-correct request frames,
//! CRC-16 computation and verification, strict validation of untrusted
//! response bytes (bounds, parity, checksum, exception flag), and the
//! single-request/single-response orchestration around it.
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Client |
//! |------|----------|--------|
//! | 0x03 | Read Holding Registers | yes |
//! | 0x10 | Write Multiple Registers | yes |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modbus_link::{FramingMode, ModbusClient, ModbusTcpClient, ModbusResult};
//!
//! #[tokio::main]
//! async fn main() -> ModbusResult<()> {
//!     let mut client =
//!         ModbusTcpClient::from_address("127.0.0.1:502", FramingMode::Tcp).await?;
//!
//!     let values = client.read_holding_registers(1, 0, 10).await?;
//!     println!("read registers: {:?}", values);
//!
//!     client.write_holding_registers(1, 100, &[0x1234]).await?;
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! Error kinds are surfaced as structured [`ModbusError`] variants rather
//! than a collapsed success/failure flag, so a CRC mismatch is
//! distinguishable from a device exception or a dead socket. No operation is
//! retried internally and no failure is fatal: a bad frame fails only the
//! exchange that produced it.

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus protocol constants based on official specification
pub mod constants;

/// Modbus CRC-16 checksum engine
pub mod crc;

/// Frame codec for both wire framings
pub mod frame;

/// Network transport layer
pub mod transport;

/// Modbus client implementations
pub mod client;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use modbus_link::tokio) ===
pub use tokio;

// === Core client API ===
pub use client::{GenericModbusClient, ModbusClient, ModbusTcpClient};

// === Error handling ===
pub use error::{ModbusError, ModbusResult};

// === Core types ===
pub use frame::{decode_registers, encode_registers, FramingMode};

// === Transport ===
pub use transport::{
    ConnectionState, ModbusTransport, StateCallback, TcpTransport, TransportStats,
};

// === Protocol limits (commonly needed constants) ===
pub use constants::{DEFAULT_UNIT_ID, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS};

/// Default connect timeout (5 seconds)
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Modbus TCP default port
pub const DEFAULT_TCP_PORT: u16 = constants::DEFAULT_TCP_PORT;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
