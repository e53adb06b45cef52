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

//! The reset/TOOL0 timing dance that puts the target into serial
//! programming mode, and the non-entry reset that lets it go again.

use std::thread;
use std::time::Duration;

use serial::SerialPort;

use crate::error::Result;
use crate::mode::{CommunicationMode, ResetLineConfig};
use crate::session::Session;
use crate::tool0::Tool0Control;

/// Inputs to [`Session::enter`].
#[derive(Debug, Clone, Copy)]
pub struct EntryOptions {
    pub mode: CommunicationMode,
    pub reset_line: ResetLineConfig,
    pub baud: u32,
    pub voltage_x10: u8,
    /// If true, block on the caller-supplied keypress callback between
    /// driving TOOL0 low and the rest of the sequence, so the operator
    /// can power the target manually.
    pub wait_for_power: bool,
}

fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}

fn drive_reset<P: SerialPort>(port: &mut P, cfg: ResetLineConfig, pin_high: bool) -> Result<()> {
    let line_level = cfg.physical_level(pin_high);
    match cfg.line {
        crate::mode::ResetLine::Dtr => port.set_dtr(line_level)?,
        crate::mode::ResetLine::Rts => port.set_rts(line_level)?,
    }
    Ok(())
}

impl<P> Session<P>
where
    P: SerialPort + Tool0Control,
{
    /// Run the entry sequence (§4.3) and negotiate the baud rate,
    /// returning a ready-to-use session.
    ///
    /// `wait_for_keypress` is invoked once, between driving TOOL0 low
    /// and the rest of the sequence, only if `options.wait_for_power` is
    /// set; otherwise it's never called.
    pub fn enter<W>(
        mut port: P,
        options: EntryOptions,
        mut wait_for_keypress: W,
    ) -> Result<Session<P>>
    where
        W: FnMut(),
    {
        let EntryOptions {
            mode,
            reset_line,
            baud,
            voltage_x10,
            wait_for_power,
        } = options;

        // Step 2: RESET high, then low. Some USB-serial bridges won't
        // emit the low edge unless preceded by an explicit high level.
        drive_reset(&mut port, reset_line, true)?;
        drive_reset(&mut port, reset_line, false)?;

        // Step 3: TOOL0 low.
        port.set_txd(false)?;

        // Step 4.
        if wait_for_power {
            wait_for_keypress();
        }

        // Step 5.
        port.flush()?;
        sleep_ms(1);

        // Step 6.
        drive_reset(&mut port, reset_line, true)?;
        sleep_ms(3);

        // Step 7.
        port.set_txd(true)?;
        sleep_ms(1);
        port.flush()?;

        let mut session = Session {
            port,
            mode,
            reset_line,
        };

        // Step 8: single mode-select byte, echo consumed in single-wire mode.
        session.send_mode_select_byte()?;

        // Step 9.
        sleep_ms(1);

        // Step 10.
        session.baud_rate_set(baud, voltage_x10)?;

        Ok(session)
    }

    fn send_mode_select_byte(&mut self) -> Result<()> {
        let byte = self.mode.mode_select_byte();
        self.port.write_all(&[byte])?;
        self.port.flush()?;

        if self.mode.has_echo() {
            let mut echo = [0u8; 1];
            self.port.read_exact(&mut echo)?;
        }

        Ok(())
    }

    /// Return the target to application mode by toggling lines directly
    /// (as opposed to [`Session::reset_command`], which asks the
    /// bootloader to do it over the wire protocol).
    ///
    /// Drives TOOL0 high, RESET low, waits at least 10ms, then drives
    /// RESET high again.
    pub fn reset(&mut self) -> Result<()> {
        self.port.set_txd(true)?;
        drive_reset(&mut self.port, self.reset_line, false)?;
        sleep_ms(10);
        drive_reset(&mut self.port, self.reset_line, true)?;

        Ok(())
    }
}
