// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;

use crate::constants::{ACK, BLANK_ERROR};

/// Errors produced by the RL78 bootloader driver.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The underlying serial port returned an I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A read didn't produce the expected bytes before the port's timeout.
    #[error("timed out waiting for a response")]
    Timeout,

    /// The caller asked to send a payload larger than the wire format allows.
    #[error("payload of {len} bytes exceeds the maximum for this frame type")]
    PayloadTooLarge { len: usize },

    /// A response record didn't start with the expected marker, or its
    /// trailer was neither `ETX` nor `ETB`.
    #[error("malformed response frame")]
    FormatError,

    /// The response's decoded `LEN` didn't match what the caller expected.
    #[error("expected a {expected}-byte response, got {got}")]
    ExpectedLengthError { expected: usize, got: usize },

    /// The response's checksum byte didn't match the recomputed checksum.
    #[error("checksum mismatch: expected {expected:#04X}, got {got:#04X}")]
    ChecksumError { expected: u8, got: u8 },

    /// The target returned a status byte that's neither `ACK` nor, for
    /// blank-check, `BLANK_ERROR`.
    #[error("target reported status {0}")]
    TargetStatus(StatusCode),

    /// An address given to an orchestrator or command-layer operation
    /// isn't aligned to `FLASH_BLOCK_SIZE`.
    #[error("address {address:#010X} is not block-aligned")]
    Misaligned { address: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serial::Error> for Error {
    fn from(err: serial::Error) -> Self {
        Error::Io(err.into())
    }
}

/// A raw status byte from the target, interpreted per §6/§7 of the
/// protocol: `ACK` folds to success (`0`), `BLANK_ERROR` (from blank-check
/// only) is a positive non-error result, anything else is the raw byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u8);

impl StatusCode {
    /// `0` on success/ACK, the raw status byte otherwise, as a plain
    /// integer in the convention of §6 (negative values are reserved for
    /// the transport-level variants of [`Error`], not this type).
    pub fn code(self) -> i32 {
        if self.0 == ACK {
            0
        } else {
            i32::from(self.0)
        }
    }

    /// Whether this status means "operation succeeded".
    pub fn is_ack(self) -> bool {
        self.0 == ACK
    }

    /// Whether this status means "block is not blank" (blank-check only).
    pub fn is_blank_error(self) -> bool {
        self.0 == BLANK_ERROR
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04X}", self.0)
    }
}

/// Negative, named transport error codes, per §6 of the protocol.
impl Error {
    pub const FORMAT_ERROR_CODE: i32 = -1;
    pub const CHECKSUM_ERROR_CODE: i32 = -2;
    pub const EXPECTED_LENGTH_ERROR_CODE: i32 = -3;

    /// The numeric code for this error, per the §6 return-value convention.
    /// Returns `None` for errors that have no fixed numeric code (I/O,
    /// timeouts, and programmer-error preconditions).
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::FormatError => Some(Self::FORMAT_ERROR_CODE),
            Error::ChecksumError { .. } => Some(Self::CHECKSUM_ERROR_CODE),
            Error::ExpectedLengthError { .. } => {
                Some(Self::EXPECTED_LENGTH_ERROR_CODE)
            }
            Error::TargetStatus(status) => Some(status.code()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_status_is_success() {
        let status = StatusCode(ACK);
        assert!(status.is_ack());
        assert_eq!(status.code(), 0);
    }

    #[test]
    fn blank_error_is_positive() {
        let status = StatusCode(BLANK_ERROR);
        assert!(status.is_blank_error());
        assert_eq!(status.code(), i32::from(BLANK_ERROR));
    }

    #[test]
    fn named_error_codes() {
        assert_eq!(Error::FormatError.code(), Some(-1));
        assert_eq!(
            Error::ChecksumError { expected: 1, got: 2 }.code(),
            Some(-2)
        );
        assert_eq!(
            Error::ExpectedLengthError { expected: 1, got: 2 }.code(),
            Some(-3)
        );
    }
}
