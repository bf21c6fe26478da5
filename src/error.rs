//! Core error types and result handling
//!
//! Every failure mode of the protocol layer is a distinct [`ModbusError`]
//! variant rather than a collapsed boolean outcome, so callers can tell a
//! corrupted frame from a device-reported exception or a dead socket.
//!
//! No error here is fatal to the client: a malformed or corrupted frame fails
//! only the single exchange that produced it, and the connection remains
//! usable for subsequent operations.

use thiserror::Error;

/// Result type used throughout the crate.
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Errors produced by the Modbus protocol layer.
#[derive(Debug, Error)]
pub enum ModbusError {
    /// Connect, send, or receive failure in the underlying transport.
    #[error("transport error: {message}")]
    Transport {
        /// Failure description
        message: String,
    },

    /// A response violated a length or parity bound.
    #[error("malformed response: {message}")]
    Malformed {
        /// What bound was violated
        message: String,
    },

    /// The trailing CRC of an RTU-framed response did not match.
    #[error("CRC mismatch: expected {expected:#06x}, got {actual:#06x}")]
    CrcMismatch {
        /// CRC computed over the frame body
        expected: u16,
        /// CRC carried in the frame trailer
        actual: u16,
    },

    /// The device answered with a Modbus exception response.
    #[error("device exception: function {function:#04x}, code {code:#04x} ({})", exception_description(*code))]
    Exception {
        /// Original function code (high bit cleared)
        function: u8,
        /// Modbus exception code
        code: u8,
    },

    /// A write acknowledgement failed its validation check.
    #[error("write not acknowledged: {message}")]
    AckMismatch {
        /// What the acknowledgement check found
        message: String,
    },

    /// A request could not be built from the given arguments.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Why the request was rejected
        message: String,
    },

    /// Client configuration problem (bad address, etc).
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem
        message: String,
    },
}

impl ModbusError {
    /// Create a transport error.
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a malformed-response error.
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Create a write-acknowledgement error.
    pub fn ack_mismatch<S: Into<String>>(message: S) -> Self {
        Self::AckMismatch {
            message: message.into(),
        }
    }

    /// Create an invalid-request error.
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error originated in the transport rather than the protocol.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

/// Human-readable description for a Modbus exception code.
pub fn exception_description(code: u8) -> &'static str {
    match code {
        0x01 => "Illegal Function",
        0x02 => "Illegal Data Address",
        0x03 => "Illegal Data Value",
        0x04 => "Server Device Failure",
        0x05 => "Acknowledge",
        0x06 => "Server Device Busy",
        0x08 => "Memory Parity Error",
        0x0A => "Gateway Path Unavailable",
        0x0B => "Gateway Target Device Failed to Respond",
        _ => "Unknown Exception",
    }
}
