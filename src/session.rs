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

use serial::SerialPort;

use crate::mode::{CommunicationMode, ResetLineConfig};

/// A session with a target running the RL78 Protocol A bootloader.
///
/// Holds no state beyond the communication mode, the reset-line mapping
/// and the serial port handle; a session is entry → identify → zero or
/// more block operations → reset.
pub struct Session<P> {
    pub(crate) port: P,
    pub(crate) mode: CommunicationMode,
    pub(crate) reset_line: ResetLineConfig,
}

impl<P> Session<P>
where
    P: SerialPort,
{
    /// The communication mode latched at entry.
    pub fn communication_mode(&self) -> CommunicationMode {
        self.mode
    }

    /// Consume the session, returning the underlying port.
    pub fn into_inner(self) -> P {
        self.port
    }
}

impl<P> fmt::Debug for Session<P> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Session")
            .field("mode", &self.mode)
            .field("reset_line", &self.reset_line)
            .field("port", &())
            .finish()
    }
}
