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

//! An in-memory, scriptable stand-in for [`serial::SerialPort`], used by
//! unit tests throughout this crate to exercise the codec, command layer
//! and orchestrator without real hardware.

use std::{
    cell::RefCell,
    collections::VecDeque,
    io,
    rc::Rc,
    time::Duration,
};

use serial::SerialPort;

#[derive(Default)]
struct Inner {
    written: Vec<u8>,
    read_queue: VecDeque<u8>,
    loopback: bool,
    rts: bool,
    dtr: bool,
    txd: bool,
}

/// A mock serial port. Cloning shares the same underlying buffers, so a
/// test can hold one handle to inspect what was written while another
/// (possibly moved into a `Session`) is driven by the code under test.
#[derive(Clone)]
pub(crate) struct MockPort {
    inner: Rc<RefCell<Inner>>,
}

impl MockPort {
    pub(crate) fn new() -> Self {
        MockPort {
            inner: Rc::new(RefCell::new(Inner::default())),
        }
    }

    /// Append bytes the next `read`/`read_exact` calls should return.
    pub(crate) fn queue_read(&mut self, bytes: &[u8]) {
        self.inner.borrow_mut().read_queue.extend(bytes.iter().copied());
    }

    /// Return and clear everything written so far.
    pub(crate) fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.inner.borrow_mut().written)
    }

    /// Every write is also appended to the read queue, simulating
    /// single-wire echo.
    pub(crate) fn enable_loopback(&mut self) {
        self.inner.borrow_mut().loopback = true;
    }

    pub(crate) fn rts(&self) -> bool {
        self.inner.borrow().rts
    }

    pub(crate) fn dtr(&self) -> bool {
        self.inner.borrow().dtr
    }

    pub(crate) fn txd(&self) -> bool {
        self.inner.borrow().txd
    }
}

impl crate::tool0::Tool0Control for MockPort {
    fn set_txd(&mut self, level: bool) -> io::Result<()> {
        self.inner.borrow_mut().txd = level;
        Ok(())
    }
}

impl io::Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.inner.borrow_mut();
        if inner.read_queue.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "mock port: no data queued"));
        }

        let mut n = 0;
        while n < buf.len() {
            match inner.read_queue.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }

        Ok(n)
    }
}

impl io::Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.borrow_mut();
        inner.written.extend_from_slice(buf);
        if inner.loopback {
            inner.read_queue.extend(buf.iter().copied());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialPort for MockPort {
    fn timeout(&self) -> Duration {
        Duration::from_millis(200)
    }

    fn set_timeout(&mut self, _timeout: Duration) -> serial::Result<()> {
        Ok(())
    }

    fn configure(&mut self, _settings: &serial::PortSettings) -> serial::Result<()> {
        Ok(())
    }

    fn reconfigure(
        &mut self,
        _setup: &dyn Fn(&mut dyn serial::SerialPortSettings) -> serial::Result<()>,
    ) -> serial::Result<()> {
        Ok(())
    }

    fn set_rts(&mut self, level: bool) -> serial::Result<()> {
        self.inner.borrow_mut().rts = level;
        Ok(())
    }

    fn set_dtr(&mut self, level: bool) -> serial::Result<()> {
        self.inner.borrow_mut().dtr = level;
        Ok(())
    }

    fn read_cts(&mut self) -> serial::Result<bool> {
        Ok(false)
    }

    fn read_dsr(&mut self) -> serial::Result<bool> {
        Ok(false)
    }

    fn read_ri(&mut self) -> serial::Result<bool> {
        Ok(false)
    }

    fn read_cd(&mut self) -> serial::Result<bool> {
        Ok(false)
    }
}
