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

//! Block-aligned program/erase/verify loops built on top of the
//! single-command methods in [`crate::commands`]. This is the layer
//! that knows about [`FLASH_BLOCK_SIZE`] and turns a flat byte buffer
//! into the right sequence of commands.

use serial::SerialPort;

use crate::constants::FLASH_BLOCK_SIZE;
use crate::error::{Error, Result};
use crate::session::Session;

fn is_block_aligned(address: u32) -> bool {
    address % FLASH_BLOCK_SIZE == 0
}

fn require_aligned(address: u32) -> Result<()> {
    if is_block_aligned(address) {
        Ok(())
    } else {
        Err(Error::Misaligned { address })
    }
}

fn is_all_0xff(block: &[u8]) -> bool {
    block.iter().all(|&b| b == 0xFF)
}

impl<P> Session<P>
where
    P: SerialPort,
{
    /// Erase `size` bytes starting at `address`, one [`FLASH_BLOCK_SIZE`]
    /// block at a time. Blocks that blank-check as already erased are
    /// skipped.
    ///
    /// `address` must be block-aligned; `size` is masked down to a whole
    /// number of blocks, and any trailing partial block is silently
    /// ignored.
    pub fn erase(&mut self, address: u32, size: u32) -> Result<()> {
        require_aligned(address)?;

        let block_count = size / FLASH_BLOCK_SIZE;

        for i in 0..block_count {
            let block_start = address + i * FLASH_BLOCK_SIZE;
            let block_end = block_start + FLASH_BLOCK_SIZE - 1;

            if self.block_blank_check(block_start, block_end)? {
                log::debug!("block {:#010X} already blank, skipping erase", block_start);
                continue;
            }

            log::info!("erasing block {:#010X}", block_start);
            self.block_erase(block_start)?;
        }

        Ok(())
    }

    /// Program `image` starting at `address`, one block at a time.
    /// Blocks that are entirely `0xFF` in the image are left untouched
    /// (neither erased nor programmed); non-blank target blocks that
    /// need programming are erased first.
    ///
    /// `address` must be block-aligned. `image` is masked down to a
    /// whole number of blocks; any trailing partial block is silently
    /// ignored.
    pub fn program(&mut self, address: u32, image: &[u8]) -> Result<()> {
        require_aligned(address)?;

        for (block_start, block) in self.blocks(address, image) {
            if is_all_0xff(block) {
                log::debug!("block {:#010X} is all 0xFF in image, skipping", block_start);
                continue;
            }

            let block_end = block_start + FLASH_BLOCK_SIZE - 1;
            if !self.block_blank_check(block_start, block_end)? {
                log::info!("block {:#010X} not blank, erasing before program", block_start);
                self.block_erase(block_start)?;
            }

            log::info!("programming block {:#010X} ({} bytes)", block_start, block.len());
            self.program_block(block_start, block)?;
        }

        Ok(())
    }

    /// Verify `image` against the target starting at `address`. Blocks
    /// that are entirely `0xFF` in the image are checked with
    /// blank-check instead of a data comparison, since an erased block
    /// never round-trips through on-target verify.
    ///
    /// `address` must be block-aligned. `image` is masked down to a
    /// whole number of blocks; any trailing partial block is silently
    /// ignored.
    pub fn verify(&mut self, address: u32, image: &[u8]) -> Result<()> {
        require_aligned(address)?;

        for (block_start, block) in self.blocks(address, image) {
            if is_all_0xff(block) {
                let block_end = block_start + FLASH_BLOCK_SIZE - 1;
                if !self.block_blank_check(block_start, block_end)? {
                    return Err(Error::TargetStatus(crate::error::StatusCode(
                        crate::constants::BLANK_ERROR,
                    )));
                }
                continue;
            }

            self.verify_block(block_start, block)?;
        }

        Ok(())
    }

    /// Split `image` into `(block_start_address, slice)` pairs aligned
    /// to `FLASH_BLOCK_SIZE`. `image` is masked down to a whole number of
    /// blocks first, so every slice returned is exactly
    /// `FLASH_BLOCK_SIZE` long; any trailing partial block is silently
    /// dropped rather than programmed or verified.
    fn blocks<'a>(&self, address: u32, image: &'a [u8]) -> Vec<(u32, &'a [u8])> {
        let whole_len = image.len() / FLASH_BLOCK_SIZE as usize * FLASH_BLOCK_SIZE as usize;
        image[..whole_len]
            .chunks(FLASH_BLOCK_SIZE as usize)
            .enumerate()
            .map(|(i, chunk)| (address + i as u32 * FLASH_BLOCK_SIZE, chunk))
            .collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ACK, BLANK_ERROR, ETX, STX};
    use crate::mode::{CommunicationMode, ResetLineConfig};
    use crate::test_support::MockPort;

    fn checksum8(bytes: &[u8]) -> u8 {
        crate::codec::checksum8(bytes)
    }

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

    fn status_frame(status: u8) -> Vec<u8> {
        vec![STX, 1, status, checksum8(&[1, status]), ETX]
    }

    #[test]
    fn rejects_misaligned_address() {
        let (mut session, _probe) = session();
        let err = session.erase(1, FLASH_BLOCK_SIZE).unwrap_err();
        match err {
            Error::Misaligned { address: 1 } => {}
            other => panic!("expected Misaligned, got {:?}", other),
        }
    }

    #[test]
    fn erase_skips_blocks_that_blank_check_clean() {
        let (mut session, mut probe) = session();
        probe.queue_read(&status_frame(ACK)); // blank-check: blank

        session.erase(0, FLASH_BLOCK_SIZE).unwrap();

        // Only the blank-check command should have gone out; no erase.
        let written = probe.take_written();
        assert_eq!(written[2], crate::constants::CMD_BLOCK_BLANK_CHECK);
    }

    #[test]
    fn erase_erases_blocks_that_blank_check_dirty() {
        let (mut session, mut probe) = session();
        probe.queue_read(&status_frame(BLANK_ERROR)); // blank-check: not blank
        probe.queue_read(&status_frame(ACK)); // erase: ack

        session.erase(0, FLASH_BLOCK_SIZE).unwrap();

        let written = probe.take_written();
        // Two command frames went out: blank-check, then erase. Each
        // command frame is `[SOH, LEN, CMD, ...]`, so the first frame's
        // CMD is at offset 2 and the second's at an offset that depends
        // on the first frame's total length; just check both CMD bytes
        // appear in order.
        let blank_check_pos = written
            .iter()
            .position(|&b| b == crate::constants::CMD_BLOCK_BLANK_CHECK)
            .unwrap();
        let erase_pos = written
            .iter()
            .rposition(|&b| b == crate::constants::CMD_BLOCK_ERASE)
            .unwrap();
        assert!(blank_check_pos < erase_pos);
    }

    #[test]
    fn program_skips_all_ff_blocks() {
        let (mut session, mut probe) = session();
        let image = vec![0xFFu8; FLASH_BLOCK_SIZE as usize];

        session.program(0, &image).unwrap();

        // Nothing at all should have been written: the block is blank
        // in the image, so it's skipped before any command is sent.
        assert!(probe.take_written().is_empty());
    }
}
