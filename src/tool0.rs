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

//! TOOL0 is driven by the serial adapter's TXD line held at a static
//! break/mark level, which isn't part of `serial::SerialPort` (that
//! trait only covers DTR/RTS as modem-control lines). This is the extra
//! capability the entry sequencer and the non-entry reset need from a
//! port; binaries wire it up against their platform's break-control
//! ioctl, tests wire it up against [`crate::test_support::MockPort`].

use std::io;

/// Drive TOOL0 (the serial TXD line, held at a static level) high or low.
pub trait Tool0Control {
    fn set_txd(&mut self, level: bool) -> io::Result<()>;
}

/// `TIOCSBRK`/`TIOCCBRK` break-control ioctls drive TXD low/high on a
/// real Unix tty. This has to live here, not in a binary crate, since
/// `Tool0Control` is local to this crate but `serial::SystemPort` isn't --
/// the orphan rule only allows the impl where the trait is local.
#[cfg(unix)]
impl Tool0Control for serial::SystemPort {
    fn set_txd(&mut self, level: bool) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        let fd = self.as_raw_fd();
        let request = if level { libc::TIOCCBRK } else { libc::TIOCSBRK };
        let ret = unsafe { libc::ioctl(fd, request) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
