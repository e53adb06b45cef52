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

//! Frame codec: command/data record encoding, response record parsing,
//! checksums, and single-wire echo suppression.

use std::io;

use serial::SerialPort;

use crate::constants::{ETB, ETX, MAX_COMMAND_PAYLOAD, MAX_DATA_PAYLOAD, MAX_FRAME_LEN, SOH, STX};
use crate::error::{Error, Result};
use crate::session::Session;

/// 8-bit two's-complement negation of the sum of `bytes`, masked to 8 bits.
pub(crate) fn checksum8(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    0u8.wrapping_sub(sum)
}

impl<P> Session<P>
where
    P: SerialPort,
{
    fn read_exact_mapped(&mut self, buf: &mut [u8]) -> Result<()> {
        self.port.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::TimedOut {
                Error::Timeout
            } else {
                Error::Io(e)
            }
        })
    }

    fn discard_echo(&mut self, len: usize) -> Result<()> {
        if self.mode.has_echo() {
            let mut echo = [0u8; MAX_FRAME_LEN];
            self.read_exact_mapped(&mut echo[..len])?;
        }
        Ok(())
    }

    /// Encode and send a command record: `[SOH, LEN, CMD, payload.., CHK, ETX]`.
    ///
    /// `payload.len()` must be `<= MAX_COMMAND_PAYLOAD`; `LEN` encodes
    /// `payload.len() + 1`.
    pub(crate) fn send_command(&mut self, cmd: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_COMMAND_PAYLOAD {
            return Err(Error::PayloadTooLarge { len: payload.len() });
        }

        let mut frame = [0u8; MAX_FRAME_LEN];
        let len_byte = (payload.len() + 1) as u8;

        frame[0] = SOH;
        frame[1] = len_byte;
        frame[2] = cmd;
        frame[3..3 + payload.len()].copy_from_slice(payload);

        let chk_pos = 3 + payload.len();
        let chk = checksum8(&frame[1..chk_pos]);
        frame[chk_pos] = chk;
        frame[chk_pos + 1] = ETX;

        let total_len = chk_pos + 2;

        log::trace!("send_command cmd={:#04X} frame={:?}", cmd, &frame[..total_len]);

        self.port.write_all(&frame[..total_len])?;
        self.port.flush()?;

        self.discard_echo(total_len)?;

        Ok(())
    }

    /// Encode and send a data record: `[STX, LEN, payload.., CHK, trailer]`.
    ///
    /// `payload.len()` must be in `1..=MAX_DATA_PAYLOAD`; a payload of
    /// exactly 256 bytes encodes `LEN = 0`.
    pub(crate) fn send_data(&mut self, payload: &[u8], is_last: bool) -> Result<()> {
        if payload.is_empty() || payload.len() > MAX_DATA_PAYLOAD {
            return Err(Error::PayloadTooLarge { len: payload.len() });
        }

        let mut frame = [0u8; MAX_FRAME_LEN];
        let len_byte = if payload.len() == MAX_DATA_PAYLOAD {
            0
        } else {
            payload.len() as u8
        };

        frame[0] = STX;
        frame[1] = len_byte;
        frame[2..2 + payload.len()].copy_from_slice(payload);

        let chk_pos = 2 + payload.len();
        let chk = checksum8(&frame[1..chk_pos]);
        frame[chk_pos] = chk;
        frame[chk_pos + 1] = if is_last { ETX } else { ETB };

        let total_len = chk_pos + 2;

        log::trace!(
            "send_data len={} is_last={} frame_len={}",
            payload.len(),
            is_last,
            total_len
        );

        self.port.write_all(&frame[..total_len])?;
        self.port.flush()?;

        self.discard_echo(total_len)?;

        Ok(())
    }

    /// Receive a response record, returning its `expected_len`-byte payload.
    pub(crate) fn recv(&mut self, expected_len: usize) -> Result<Vec<u8>> {
        let mut hdr = [0u8; 2];
        self.read_exact_mapped(&mut hdr)?;

        if hdr[0] != STX {
            return Err(Error::FormatError);
        }

        let decoded_len = if hdr[1] == 0 { 256 } else { usize::from(hdr[1]) };
        if decoded_len != expected_len {
            return Err(Error::ExpectedLengthError {
                expected: expected_len,
                got: decoded_len,
            });
        }

        let mut body = vec![0u8; expected_len + 2];
        self.read_exact_mapped(&mut body)?;

        let trailer = body[body.len() - 1];
        if trailer != ETX && trailer != ETB {
            return Err(Error::FormatError);
        }

        let payload = &body[..expected_len];
        let received_chk = body[expected_len];

        let mut covered = Vec::with_capacity(1 + expected_len);
        covered.push(hdr[1]);
        covered.extend_from_slice(payload);
        let computed_chk = checksum8(&covered);

        if computed_chk != received_chk {
            return Err(Error::ChecksumError {
                expected: computed_chk,
                got: received_chk,
            });
        }

        log::trace!("recv payload={:?}", payload);

        Ok(payload.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{CommunicationMode, ResetLineConfig};
    use crate::test_support::MockPort;

    fn session(mode: CommunicationMode, port: MockPort) -> Session<MockPort> {
        Session {
            port,
            mode,
            reset_line: ResetLineConfig::default(),
        }
    }

    #[test]
    fn checksum8_matches_spec_formula() {
        // -sum(bytes) & 0xFF
        assert_eq!(checksum8(&[0x01, 0x02]), (0u8.wrapping_sub(3)));
    }

    #[test]
    fn send_command_round_trip() {
        let port = MockPort::new();
        let mut probe = port.clone();
        let mut session = session(CommunicationMode::TwoWire, port);
        session.send_command(0x9A, &[0xAA, 0xBB]).unwrap();

        let written = probe.take_written();
        let expected_chk = checksum8(&[3, 0x9A, 0xAA, 0xBB]);
        assert_eq!(
            written,
            vec![SOH, 3, 0x9A, 0xAA, 0xBB, expected_chk, ETX]
        );
    }

    #[test]
    fn send_data_256_encodes_len_zero() {
        let port = MockPort::new();
        let mut probe = port.clone();
        let mut session = session(CommunicationMode::TwoWire, port);
        let payload = vec![0x5Au8; 256];
        session.send_data(&payload, true).unwrap();

        let written = probe.take_written();
        assert_eq!(written[0], STX);
        assert_eq!(written[1], 0); // LEN encodes 256 as 0
        assert_eq!(*written.last().unwrap(), ETX);
    }

    #[test]
    fn send_data_non_last_uses_etb() {
        let port = MockPort::new();
        let mut probe = port.clone();
        let mut session = session(CommunicationMode::TwoWire, port);
        let payload = vec![0x5Au8; 256];
        session.send_data(&payload, false).unwrap();

        let written = probe.take_written();
        assert_eq!(*written.last().unwrap(), ETB);
    }

    #[test]
    fn one_wire_echo_is_consumed_before_recv() {
        let mut port = MockPort::new();
        // Echo: whatever gets written is queued back as read data.
        port.enable_loopback();
        let mut probe = port.clone();

        let mut session = session(CommunicationMode::OneWire, port);
        // The write below queues its own echo; `discard_echo` consumes
        // exactly those bytes before the real response is queued here,
        // simulating the device replying only after the echo settles.
        session.send_command(0x20, &[]).unwrap();
        probe.queue_read(&[STX, 2, 0xAA, 0xBB, checksum8(&[2, 0xAA, 0xBB]), ETX]);

        let payload = session.recv(2).unwrap();
        assert_eq!(payload, vec![0xAA, 0xBB]);
    }

    #[test]
    fn checksum_mismatch_is_rejected() {
        let mut port = MockPort::new();
        let good_chk = checksum8(&[2, 0xAA, 0xBB]);
        port.queue_read(&[STX, 2, 0xAA, 0xBB, good_chk ^ 0x01, ETX]);

        let mut session = session(CommunicationMode::TwoWire, port);
        let err = session.recv(2).unwrap_err();
        match err {
            Error::ChecksumError { .. } => {}
            other => panic!("expected ChecksumError, got {:?}", other),
        }
    }

    #[test]
    fn length_mismatch_is_rejected_even_if_checksum_would_be_fine() {
        let mut port = MockPort::new();
        // Claims LEN=3 but caller expects 2.
        let chk = checksum8(&[3, 0xAA, 0xBB, 0xCC]);
        port.queue_read(&[STX, 3, 0xAA, 0xBB, 0xCC, chk, ETX]);

        let mut session = session(CommunicationMode::TwoWire, port);
        let err = session.recv(2).unwrap_err();
        match err {
            Error::ExpectedLengthError { expected: 2, got: 3 } => {}
            other => panic!("expected ExpectedLengthError, got {:?}", other),
        }
    }

    #[test]
    fn oversized_command_payload_is_rejected() {
        let port = MockPort::new();
        let mut session = session(CommunicationMode::TwoWire, port);
        let payload = vec![0u8; 256];
        let err = session.send_command(0x00, &payload).unwrap_err();
        match err {
            Error::PayloadTooLarge { len: 256 } => {}
            other => panic!("expected PayloadTooLarge, got {:?}", other),
        }
    }
}
