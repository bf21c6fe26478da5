//! Modbus CRC-16 checksum engine
//!
//! RTU-framed messages carry a CRC-16/MODBUS trailer: initial accumulator
//! 0xFFFF, reflected polynomial 0xA001, appended to the frame low byte first.
//! The computation itself is delegated to the `crc` crate; this module pins
//! the algorithm choice and the trailer byte order in one place.

use crc::{Crc, CRC_16_MODBUS};

use crate::constants::CRC_LEN;
use crate::error::{ModbusError, ModbusResult};

const MODBUS_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Compute the Modbus CRC over a byte sequence.
///
/// Pure and deterministic; an empty input yields the initial value 0xFFFF.
///
/// # Example
///
/// ```rust
/// use modbus_link::crc::checksum;
///
/// // CRC-16/MODBUS check value
/// assert_eq!(checksum(b"123456789"), 0x4B37);
/// assert_eq!(checksum(&[]), 0xFFFF);
/// ```
#[inline]
pub fn checksum(data: &[u8]) -> u16 {
    MODBUS_CRC.checksum(data)
}

/// Append the CRC trailer (low byte first) over the current frame contents.
#[inline]
pub fn append_crc(frame: &mut Vec<u8>) {
    let crc = checksum(frame);
    frame.extend_from_slice(&crc.to_le_bytes());
}

/// Verify the trailing CRC of a received frame.
///
/// The checksum is computed over every byte preceding the two-byte trailer
/// and compared against the trailer read low byte first.
pub fn check_trailing_crc(frame: &[u8]) -> ModbusResult<()> {
    if frame.len() < CRC_LEN + 1 {
        return Err(ModbusError::malformed(format!(
            "frame too short for CRC trailer: {} bytes",
            frame.len()
        )));
    }

    let body_len = frame.len() - CRC_LEN;
    let expected = checksum(&frame[..body_len]);
    let actual = u16::from_le_bytes([frame[body_len], frame[body_len + 1]]);

    if expected != actual {
        return Err(ModbusError::CrcMismatch { expected, actual });
    }

    Ok(())
}
