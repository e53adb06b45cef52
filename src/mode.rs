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

//! Session-wide configuration: communication mode and the reset-line
//! mapping. Both are latched once by [`crate::Session::enter`] and never
//! change for the lifetime of the session.

use std::{error::Error as StdError, fmt, str::FromStr};

/// Half-duplex (`OneWire`, TXD shared with RX, writes are echoed back)
/// or full-duplex (`TwoWire`, independent TX/RX, no echo).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunicationMode {
    /// TXD and RXD share one bus; everything written is read back.
    OneWire,
    /// Independent TX and RX; no echo suppression needed.
    TwoWire,
}

impl CommunicationMode {
    /// Whether frames written by the host must have their echo consumed
    /// before a reply can be read.
    #[inline]
    pub fn has_echo(self) -> bool {
        matches!(self, CommunicationMode::OneWire)
    }

    pub(crate) fn mode_select_byte(self) -> u8 {
        match self {
            CommunicationMode::OneWire => crate::constants::MODE_SELECT_ONE_WIRE,
            CommunicationMode::TwoWire => crate::constants::MODE_SELECT_TWO_WIRE,
        }
    }
}

/// Which modem-control line drives the target's RESET pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetLine {
    Dtr,
    Rts,
}

#[derive(Debug)]
pub struct ParseResetLineError;

impl fmt::Display for ParseResetLineError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "invalid value, reset line must be one of: `dtr`, `rts`")
    }
}

impl StdError for ParseResetLineError {}

impl FromStr for ResetLine {
    type Err = ParseResetLineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dtr" | "DTR" => Ok(ResetLine::Dtr),
            "rts" | "RTS" => Ok(ResetLine::Rts),
            _ => Err(ParseResetLineError),
        }
    }
}

/// Reset-line mapping: which line drives RESET, and whether it's
/// logically inverted. TOOL0 is always driven by the TXD break/level,
/// so it has no entry here.
#[derive(Debug, Clone, Copy)]
pub struct ResetLineConfig {
    pub line: ResetLine,
    pub inverted: bool,
}

impl ResetLineConfig {
    pub fn new(line: ResetLine, inverted: bool) -> Self {
        ResetLineConfig { line, inverted }
    }

    /// The level to drive on the control line to assert `level` on the
    /// logical RESET pin, accounting for inversion.
    #[inline]
    pub(crate) fn physical_level(self, asserted: bool) -> bool {
        if self.inverted {
            !asserted
        } else {
            asserted
        }
    }
}

impl Default for ResetLineConfig {
    fn default() -> Self {
        ResetLineConfig {
            line: ResetLine::Rts,
            inverted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_wire_has_echo() {
        assert!(CommunicationMode::OneWire.has_echo());
        assert!(!CommunicationMode::TwoWire.has_echo());
    }

    #[test]
    fn reset_line_parses() {
        assert_eq!("dtr".parse::<ResetLine>().unwrap(), ResetLine::Dtr);
        assert_eq!("RTS".parse::<ResetLine>().unwrap(), ResetLine::Rts);
        assert!("xyz".parse::<ResetLine>().is_err());
    }

    #[test]
    fn inversion_flips_physical_level() {
        let normal = ResetLineConfig::new(ResetLine::Rts, false);
        assert!(normal.physical_level(true));
        assert!(!normal.physical_level(false));

        let inverted = ResetLineConfig::new(ResetLine::Rts, true);
        assert!(!inverted.physical_level(true));
        assert!(inverted.physical_level(false));
    }
}
