//! Modbus protocol constants based on official specification
//!
//! Frame bounds below are derived from the byte layouts of the two supported
//! framings: TCP (MBAP header) and RTU framing carried over a TCP stream.

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Modbus MBAP header length for TCP framing
/// Format: Transaction ID(2) + Protocol ID(2) + Length(2) = 6 bytes
/// The unit id that follows is counted by the Length field, not by this.
pub const MBAP_HEADER_LEN: usize = 6;

/// CRC trailer length for RTU framing (low byte first)
pub const CRC_LEN: usize = 2;

/// Minimum length of a TCP-framed read response
/// MBAP(6) + Unit ID(1) + Function(1) + Byte Count(1) = 9 bytes
pub const TCP_READ_RESPONSE_MIN: usize = 9;

/// Minimum length of an RTU-framed read response
/// Unit ID(1) + Function(1) + Byte Count(1) + CRC(2) = 5 bytes
pub const RTU_READ_RESPONSE_MIN: usize = 5;

/// Minimum length of a TCP-framed write acknowledgement
/// MBAP(6) + Unit ID(1) + Function(1) + Address(2) + Quantity(2) = 12 bytes
pub const TCP_WRITE_ACK_MIN: usize = 12;

/// Minimum length of an RTU-framed write acknowledgement
/// Unit ID(1) + Function(1) + Address(2) + Quantity(2) + CRC(2) = 8 bytes
pub const RTU_WRITE_ACK_MIN: usize = 8;

/// Upper bound for a single bounded receive
///
/// Sized for the worst case of either framing: the largest frame is a
/// TCP-framed read response for 125 registers, 9 + 2 x 125 = 259 bytes
/// (equivalently MBAP(6) + maximum length field value of 254 = 260).
pub const RESPONSE_MAX_LEN: usize = 260;

/// Lower bound for a single bounded receive; an empty read is a failure
pub const RESPONSE_MIN_LEN: usize = 1;

// ============================================================================
// Operation Limits
// ============================================================================

/// Maximum number of registers for FC03 (Read Holding Registers)
///
/// Response PDU: Function(1) + Byte Count(1) + N x 2 bytes, bounded by the
/// 253-byte PDU limit: N <= (253 - 2) / 2 = 125 registers.
pub const MAX_READ_REGISTERS: usize = 125;

/// Maximum number of registers for FC16 (Write Multiple Registers)
///
/// The request carries the data length in a single byte-count byte, so
/// N x 2 must fit in a u8: N <= 127. Larger writes are rejected outright
/// rather than silently truncating the byte count.
pub const MAX_WRITE_REGISTERS: usize = 127;

// ============================================================================
// Function Codes
// ============================================================================

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Write Multiple Registers (FC16)
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// High bit of the function code, set on device exception responses
pub const EXCEPTION_BIT: u8 = 0x80;

// ============================================================================
// Defaults
// ============================================================================

/// Default Modbus unit (slave) id
pub const DEFAULT_UNIT_ID: u8 = 1;

/// Modbus TCP default port
pub const DEFAULT_TCP_PORT: u16 = 502;
