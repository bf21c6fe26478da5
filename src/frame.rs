//! Frame codec for Modbus TCP and RTU-over-TCP
//!
//! The two framings share the same application payload (unit id, function
//! code, function data) and differ only in envelope:
//! - **TCP**: MBAP header (transaction id, protocol id, length) + payload
//! - **RTU-over-TCP**: payload + CRC-16 trailer, low byte first
//!
//! Requests are built length-correct from the start: the variable-length
//! write payload is assembled first and the MBAP length field derived from
//! it, never patched in afterwards. Responses are untrusted until every
//! length bound, the data-region parity, the CRC (RTU), and the exception
//! flag have been checked.

use tracing::{debug, warn};

use crate::constants::{
    CRC_LEN, EXCEPTION_BIT, FC_READ_HOLDING_REGISTERS, FC_WRITE_MULTIPLE_REGISTERS,
    MAX_WRITE_REGISTERS, MBAP_HEADER_LEN, RTU_READ_RESPONSE_MIN, RTU_WRITE_ACK_MIN,
    TCP_READ_RESPONSE_MIN, TCP_WRITE_ACK_MIN,
};
use crate::crc::{append_crc, check_trailing_crc};
use crate::error::{ModbusError, ModbusResult};

/// Wire framing used by a client for the lifetime of its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// Modbus TCP: MBAP header, no checksum
    Tcp,
    /// Modbus RTU framing carried over a TCP byte stream: CRC trailer, no header
    RtuOverTcp,
}

impl FramingMode {
    /// Build a read-holding-registers request (FC03).
    ///
    /// TCP framing produces a fixed 12-byte frame (the MBAP length field is
    /// always 6 for this request); RTU framing produces 8 bytes including the
    /// CRC trailer.
    pub fn build_read_request(&self, unit_id: u8, address: u16, count: u16) -> Vec<u8> {
        let mut payload = Vec::with_capacity(6);
        payload.push(unit_id);
        payload.push(FC_READ_HOLDING_REGISTERS);
        payload.extend_from_slice(&address.to_be_bytes());
        payload.extend_from_slice(&count.to_be_bytes());

        let frame = self.envelope(payload);
        debug!(
            "built FC03 request: unit={}, address={}, count={}, {} bytes",
            unit_id,
            address,
            count,
            frame.len()
        );
        frame
    }

    /// Build a write-multiple-registers request (FC16).
    ///
    /// FC16 is used unconditionally, regardless of register count. The data
    /// length travels in a single byte-count byte, so writes of more than
    /// 127 registers are rejected instead of overflowing it; empty writes
    /// are rejected as well.
    pub fn build_write_request(
        &self,
        unit_id: u8,
        address: u16,
        values: &[u16],
    ) -> ModbusResult<Vec<u8>> {
        if values.is_empty() {
            return Err(ModbusError::invalid_request("FC16 requires at least one register"));
        }
        if values.len() > MAX_WRITE_REGISTERS {
            return Err(ModbusError::invalid_request(format!(
                "write of {} registers exceeds limit of {}",
                values.len(),
                MAX_WRITE_REGISTERS
            )));
        }

        let mut payload = Vec::with_capacity(7 + values.len() * 2);
        payload.push(unit_id);
        payload.push(FC_WRITE_MULTIPLE_REGISTERS);
        payload.extend_from_slice(&address.to_be_bytes());
        payload.extend_from_slice(&(values.len() as u16).to_be_bytes());
        payload.push((values.len() * 2) as u8);
        payload.extend_from_slice(&encode_registers(values));

        let frame = self.envelope(payload);
        debug!(
            "built FC16 request: unit={}, address={}, registers={}, {} bytes",
            unit_id,
            address,
            values.len(),
            frame.len()
        );
        Ok(frame)
    }

    /// Validate a read response and decode its register data.
    ///
    /// Rejects short frames and odd data-region byte counts as
    /// [`ModbusError::Malformed`]; under RTU framing additionally verifies
    /// the CRC trailer and detects device exception responses before any
    /// data is extracted. A zero-length data region decodes to an empty
    /// vector.
    pub fn decode_read_response(&self, frame: &[u8]) -> ModbusResult<Vec<u16>> {
        let data = match self {
            FramingMode::Tcp => {
                if frame.len() < TCP_READ_RESPONSE_MIN {
                    return Err(self.too_short("read response", frame.len()));
                }

                let byte_count = frame[8] as usize;
                self.check_data_region(frame.len(), TCP_READ_RESPONSE_MIN + byte_count, byte_count)?;
                &frame[9..9 + byte_count]
            }
            FramingMode::RtuOverTcp => {
                if frame.len() < RTU_READ_RESPONSE_MIN {
                    return Err(self.too_short("read response", frame.len()));
                }
                check_trailing_crc(frame)?;

                let function = frame[1];
                if function & EXCEPTION_BIT != 0 {
                    let code = frame[2];
                    warn!(
                        "device exception: function {:#04x}, code {:#04x}",
                        function & !EXCEPTION_BIT,
                        code
                    );
                    return Err(ModbusError::Exception {
                        function: function & !EXCEPTION_BIT,
                        code,
                    });
                }

                let byte_count = frame[2] as usize;
                self.check_data_region(frame.len(), 3 + byte_count + CRC_LEN, byte_count)?;
                &frame[3..3 + byte_count]
            }
        };

        let registers = decode_registers(data);
        debug!("decoded read response: {} registers", registers.len());
        Ok(registers)
    }

    /// Validate a write acknowledgement.
    ///
    /// TCP framing checks the echoed function code; RTU framing checks the
    /// CRC trailer. The echoed address and quantity are not separately
    /// verified in either mode.
    pub fn check_write_ack(&self, frame: &[u8]) -> ModbusResult<()> {
        match self {
            FramingMode::Tcp => {
                if frame.len() < TCP_WRITE_ACK_MIN {
                    return Err(self.too_short("write acknowledgement", frame.len()));
                }
                if frame[7] != FC_WRITE_MULTIPLE_REGISTERS {
                    return Err(ModbusError::ack_mismatch(format!(
                        "expected function {:#04x}, got {:#04x}",
                        FC_WRITE_MULTIPLE_REGISTERS, frame[7]
                    )));
                }
            }
            FramingMode::RtuOverTcp => {
                if frame.len() < RTU_WRITE_ACK_MIN {
                    return Err(self.too_short("write acknowledgement", frame.len()));
                }
                check_trailing_crc(frame)?;
            }
        }

        debug!("write acknowledged ({:?} framing)", self);
        Ok(())
    }

    /// Wrap an application payload (unit id onward) in this framing's envelope.
    ///
    /// The MBAP length field counts every payload byte from the unit id
    /// onward and is derived from the finished payload.
    fn envelope(&self, payload: Vec<u8>) -> Vec<u8> {
        match self {
            FramingMode::Tcp => {
                let mut frame = Vec::with_capacity(MBAP_HEADER_LEN + payload.len());
                // Transaction id and protocol id, fixed at zero
                frame.extend_from_slice(&[0, 0, 0, 0]);
                frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
                frame.extend_from_slice(&payload);
                frame
            }
            FramingMode::RtuOverTcp => {
                let mut frame = payload;
                append_crc(&mut frame);
                frame
            }
        }
    }

    /// Length-bound and parity checks shared by both read-decode paths.
    fn check_data_region(
        &self,
        frame_len: usize,
        required_len: usize,
        byte_count: usize,
    ) -> ModbusResult<()> {
        if frame_len < required_len {
            warn!(
                "read response truncated: {} bytes, need {} for declared byte count {}",
                frame_len, required_len, byte_count
            );
            return Err(ModbusError::malformed(format!(
                "declared byte count {} exceeds frame length {}",
                byte_count, frame_len
            )));
        }
        if byte_count % 2 != 0 {
            return Err(ModbusError::malformed(format!(
                "odd data byte count: {}",
                byte_count
            )));
        }
        Ok(())
    }

    fn too_short(&self, what: &str, len: usize) -> ModbusError {
        warn!("{} too short under {:?} framing: {} bytes", what, self, len);
        ModbusError::malformed(format!("{} too short: {} bytes", what, len))
    }
}

/// Decode a data region into register values.
///
/// Reads consecutive big-endian byte pairs in ascending address order. A
/// final unpaired trailing byte, if any, is dropped rather than raising an
/// error; the read-decode paths never produce one because of the parity
/// guard, so this only matters for callers feeding raw slices directly.
pub fn decode_registers(data: &[u8]) -> Vec<u16> {
    data.chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

/// Encode register values as consecutive big-endian byte pairs.
pub fn encode_registers(values: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 2);
    for &value in values {
        bytes.extend_from_slice(&value.to_be_bytes());
    }
    bytes
}
