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

//! One method per wire command. Every command builds a little-endian
//! argument buffer, sends it, and reads back a status byte (plus, for
//! some commands, further info bytes on a second `recv`).

use std::thread;
use std::time::Duration;

use serial::SerialPort;

use crate::constants::{
    ACK, CMD_BAUD_RATE_SET, CMD_BLOCK_BLANK_CHECK, CMD_BLOCK_ERASE, CMD_CHECKSUM, CMD_PROGRAM,
    CMD_RESET, CMD_SILICON_SIGNATURE, CMD_VERIFY, DEFAULT_BAUD, MAX_DATA_PAYLOAD,
    PROGRAM_SETTLING_US_PER_KIB, RL78_BAUD_1000000, RL78_BAUD_115200, RL78_BAUD_250000,
    RL78_BAUD_500000,
};
use crate::error::{Error, Result, StatusCode};
use crate::session::Session;
use crate::signature::{SiliconSignature, SIGNATURE_LEN};

fn le24(address: u32) -> [u8; 3] {
    [address as u8, (address >> 8) as u8, (address >> 16) as u8]
}

/// Maps a requested baud rate to the wire code and the baud the target
/// will actually run at. Anything other than the four supported rates
/// is coerced to 115200.
fn baud_code_for(requested: u32) -> (u8, u32) {
    match requested {
        115_200 => (RL78_BAUD_115200, 115_200),
        250_000 => (RL78_BAUD_250000, 250_000),
        500_000 => (RL78_BAUD_500000, 500_000),
        1_000_000 => (RL78_BAUD_1000000, 1_000_000),
        other => {
            log::warn!("unsupported baud rate {}, coercing to 115200", other);
            (RL78_BAUD_115200, DEFAULT_BAUD)
        }
    }
}

fn to_serial_baud_rate(baud: u32) -> serial::BaudRate {
    match baud {
        110 => serial::BaudRate::Baud110,
        300 => serial::BaudRate::Baud300,
        600 => serial::BaudRate::Baud600,
        1200 => serial::BaudRate::Baud1200,
        2400 => serial::BaudRate::Baud2400,
        4800 => serial::BaudRate::Baud4800,
        9600 => serial::BaudRate::Baud9600,
        19200 => serial::BaudRate::Baud19200,
        38400 => serial::BaudRate::Baud38400,
        57600 => serial::BaudRate::Baud57600,
        115200 => serial::BaudRate::Baud115200,
        other => serial::BaudRate::BaudOther(other as usize),
    }
}

impl<P> Session<P>
where
    P: SerialPort,
{
    fn expect_ack(&mut self) -> Result<()> {
        let status = self.recv(1)?[0];
        if status == ACK {
            Ok(())
        } else {
            Err(Error::TargetStatus(StatusCode(status)))
        }
    }

    /// Negotiate the baud rate and target voltage. Completes the entry
    /// handshake. Switches the port's baud afterwards unless the
    /// effective (possibly coerced) baud is the default 115200.
    ///
    /// Returns `(clock_mhz, mode)` as reported by the target.
    pub fn baud_rate_set(&mut self, baud: u32, voltage_x10: u8) -> Result<(u8, u8)> {
        let (code, effective_baud) = baud_code_for(baud);

        self.send_command(CMD_BAUD_RATE_SET, &[code, voltage_x10])?;
        self.expect_ack()?;
        let info = self.recv(2)?;

        if effective_baud != DEFAULT_BAUD {
            let rate = to_serial_baud_rate(effective_baud);
            self.port
                .reconfigure(&|settings| settings.set_baud_rate(rate))?;
        }

        Ok((info[0], info[1]))
    }

    /// Read the target's silicon signature.
    pub fn silicon_signature(&mut self) -> Result<SiliconSignature> {
        self.send_command(CMD_SILICON_SIGNATURE, &[])?;
        self.expect_ack()?;
        let info = self.recv(SIGNATURE_LEN)?;
        Ok(SiliconSignature::parse(&info))
    }

    /// Erase the block starting at `address`. `address` must be the
    /// block's start.
    pub fn block_erase(&mut self, address: u32) -> Result<()> {
        self.send_command(CMD_BLOCK_ERASE, &le24(address))?;
        self.expect_ack()
    }

    /// Blank-check `[start, end]`. Returns `true` if the range is blank,
    /// `false` if the target reported `BLANK_ERROR` (non-blank, not an
    /// error at this layer); any other status is a command failure.
    pub fn block_blank_check(&mut self, start: u32, end: u32) -> Result<bool> {
        let mut args = [0u8; 7];
        args[0..3].copy_from_slice(&le24(start));
        args[3..6].copy_from_slice(&le24(end));
        args[6] = 0x00;

        self.send_command(CMD_BLOCK_BLANK_CHECK, &args)?;
        let status = self.recv(1)?[0];
        match status {
            ACK => Ok(true),
            crate::constants::BLANK_ERROR => Ok(false),
            other => Err(Error::TargetStatus(StatusCode(other))),
        }
    }

    /// On-target 16-bit checksum of `[start, end]`.
    pub fn checksum(&mut self, start: u32, end: u32) -> Result<u16> {
        let mut args = [0u8; 6];
        args[0..3].copy_from_slice(&le24(start));
        args[3..6].copy_from_slice(&le24(end));

        self.send_command(CMD_CHECKSUM, &args)?;
        self.expect_ack()?;
        let info = self.recv(2)?;
        Ok(u16::from(info[0]) | (u16::from(info[1]) << 8))
    }

    /// Program `data` into `[start, start + data.len())`. Single command
    /// invocation, no block alignment or blank-check decisions -- see
    /// [`crate::Session::program`] for the public, block-aware API.
    pub(crate) fn program_block(&mut self, start: u32, data: &[u8]) -> Result<()> {
        let end = start + data.len() as u32 - 1;
        let mut args = [0u8; 6];
        args[0..3].copy_from_slice(&le24(start));
        args[3..6].copy_from_slice(&le24(end));

        self.send_command(CMD_PROGRAM, &args)?;
        self.expect_ack()?;

        self.send_bulk_data(data, false)?;

        let settle_us = (data.len() as u64 / 1024 + 1) * PROGRAM_SETTLING_US_PER_KIB;
        thread::sleep(Duration::from_micros(settle_us));

        self.expect_ack()
    }

    /// Verify `data` against `[start, start + data.len())`. Single
    /// command invocation -- see [`crate::Session::verify`] for the
    /// public, block-aware API.
    pub(crate) fn verify_block(&mut self, start: u32, data: &[u8]) -> Result<()> {
        let end = start + data.len() as u32 - 1;
        let mut args = [0u8; 6];
        args[0..3].copy_from_slice(&le24(start));
        args[3..6].copy_from_slice(&le24(end));

        self.send_command(CMD_VERIFY, &args)?;
        self.expect_ack()?;

        // Verify needs a settling delay before each per-chunk status can
        // be read back; program doesn't (it only settles once, after
        // the whole transfer, before its trailing status).
        self.send_bulk_data(data, true)
    }

    /// Chunk `data` into frames of up to 256 bytes and send each,
    /// checking the 2-byte per-frame status. `settle_before_status`
    /// adds a short delay before each per-chunk status read, needed by
    /// verify but not by program.
    fn send_bulk_data(&mut self, data: &[u8], settle_before_status: bool) -> Result<()> {
        let mut offset = 0;
        while offset < data.len() {
            let remaining = data.len() - offset;
            let chunk_len = remaining.min(MAX_DATA_PAYLOAD);
            let is_last = chunk_len == remaining;

            self.send_data(&data[offset..offset + chunk_len], is_last)?;

            if settle_before_status {
                thread::sleep(Duration::from_millis(10));
            }

            let status = self.recv(2)?;
            if status[0] != ACK || status[1] != ACK {
                return Err(Error::TargetStatus(StatusCode(
                    if status[0] != ACK { status[0] } else { status[1] },
                )));
            }

            offset += chunk_len;
        }

        Ok(())
    }

    /// Return the target to application mode via the wire protocol
    /// (as opposed to the line-toggle reset of [`Session::reset`]).
    pub fn reset_command(&mut self) -> Result<()> {
        self.send_command(CMD_RESET, &[])?;
        self.expect_ack()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ETX, STX};
    use crate::mode::{CommunicationMode, ResetLineConfig};
    use crate::test_support::MockPort;

    fn session() -> (Session<MockPort>, MockPort) {
        let port = MockPort::new();
        let probe = port.clone();
        (
            Session {
                port,
                mode: CommunicationMode::TwoWire,
                reset_line: ResetLineConfig::default(),
            },
            probe,
        )
    }

    fn checksum8(bytes: &[u8]) -> u8 {
        crate::codec::checksum8(bytes)
    }

    #[test]
    fn baud_coercion_warns_and_keeps_115200() {
        let (mut session, mut probe) = session();
        probe.queue_read(&[STX, 1, ACK, checksum8(&[1, ACK]), ETX]);
        probe.queue_read(&[STX, 2, 10, 0, checksum8(&[2, 10, 0]), ETX]);

        let (clock, mode) = session.baud_rate_set(57_600, 33).unwrap();
        assert_eq!((clock, mode), (10, 0));
    }

    #[test]
    fn blank_check_non_blank_is_not_an_error() {
        let (mut session, mut probe) = session();
        probe.queue_read(&[STX, 1, crate::constants::BLANK_ERROR, checksum8(&[1, crate::constants::BLANK_ERROR]), ETX]);

        let blank = session.block_blank_check(0, 0x3FF).unwrap();
        assert!(!blank);
    }

    #[test]
    fn silicon_signature_roundtrip() {
        let (mut session, mut probe) = session();
        probe.queue_read(&[STX, 1, ACK, checksum8(&[1, ACK]), ETX]);

        let payload: [u8; SIGNATURE_LEN] = [
            0x03, 0x01, 0x0A, b'R', b'5', b'F', b'1', b'0', b'0', b'C', b'B',
            b'A', 0x00, 0xFF, 0x7F, 0x00, 0xFF, 0xFF, 0x00, 0x01, 0x02, 0x03,
        ];
        let mut frame = vec![STX, 22];
        frame.extend_from_slice(&payload);
        let mut covered = vec![22u8];
        covered.extend_from_slice(&payload);
        frame.push(checksum8(&covered));
        frame.push(ETX);
        probe.queue_read(&frame);

        let sig = session.silicon_signature().unwrap();
        assert_eq!(sig.device_name_str(), "R5F100CBA\0");
    }
}
