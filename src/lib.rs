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

//! Driver for the Renesas RL78 family's serial bootloader ("Protocol A").
//!
//! A [`Session`] is built from a connected, not-yet-synchronized
//! [`serial::SerialPort`] via [`Session::enter`], which runs the
//! reset/TOOL0 timing dance and negotiates the baud rate. From there,
//! [`Session::identify`] reads the target's silicon signature, and
//! [`Session::erase`], [`Session::program`] and [`Session::verify`]
//! operate on the flash in [`constants::FLASH_BLOCK_SIZE`]-aligned
//! blocks. [`Session::reset`] releases the target back into application
//! code; [`Session::checksum`] asks the target to checksum a range, for
//! comparison against [`util::checksum_image`].
//!
//! ```no_run
//! use rl78::{EntryOptions, CommunicationMode, mode::{ResetLine, ResetLineConfig}};
//!
//! # fn main() -> rl78::Result<()> {
//! let port = serial::open("/dev/ttyUSB0")?;
//! let options = EntryOptions {
//!     mode: CommunicationMode::TwoWire,
//!     reset_line: ResetLineConfig::new(ResetLine::Rts, false),
//!     baud: 115_200,
//!     voltage_x10: 33,
//!     wait_for_power: false,
//! };
//!
//! // `port` needs `rl78::tool0::Tool0Control` for a real target; see
//! // `rl78-prog` for the Unix break-control implementation.
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod error;
pub mod mode;
pub mod ports;
pub mod signature;
pub mod tool0;
pub mod util;

mod codec;
mod commands;
mod entry;
mod orchestrator;
mod session;

#[cfg(test)]
mod test_support;

pub use entry::EntryOptions;
pub use error::{Error, Result, StatusCode};
pub use mode::CommunicationMode;
pub use session::Session;
pub use signature::SiliconSignature;

impl<P> Session<P>
where
    P: serial::SerialPort,
{
    /// Read and parse the target's silicon signature. An alias for
    /// [`Session::silicon_signature`] under the name used by the rest
    /// of the driver's public surface (`enter`, `identify`, `program`,
    /// `erase`, `verify`, `checksum`, `reset`).
    pub fn identify(&mut self) -> Result<SiliconSignature> {
        self.silicon_signature()
    }
}
