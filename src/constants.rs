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

//! Wire-level constants for the RL78 Protocol A bootloader.

/// Start-of-command marker, begins a command record.
pub const SOH: u8 = 0x01;
/// Start-of-data/response marker, begins a data or response record.
pub const STX: u8 = 0x02;
/// Trailer marking the last data/response frame of a transfer.
pub const ETX: u8 = 0x03;
/// Trailer marking a non-final data/response frame of a transfer.
pub const ETB: u8 = 0x17;

/// Status byte meaning success.
pub const ACK: u8 = 0x06;
/// Status byte meaning "block not blank", returned only by blank-check.
pub const BLANK_ERROR: u8 = 0x1B;

/// Maximum command payload length (`LEN` encodes `len(payload)+1` in one byte).
pub const MAX_COMMAND_PAYLOAD: usize = 255;
/// Maximum data-record payload length (`LEN == 0` encodes 256).
pub const MAX_DATA_PAYLOAD: usize = 256;
/// Largest frame on the wire: start + len + cmd + payload + chk + trailer.
pub const MAX_FRAME_LEN: usize = MAX_DATA_PAYLOAD + 5;

pub const CMD_BAUD_RATE_SET: u8 = 0x9A;
pub const CMD_SILICON_SIGNATURE: u8 = 0xC0;
pub const CMD_BLOCK_ERASE: u8 = 0x22;
pub const CMD_BLOCK_BLANK_CHECK: u8 = 0x32;
pub const CMD_PROGRAM: u8 = 0x40;
pub const CMD_VERIFY: u8 = 0x13;
pub const CMD_CHECKSUM: u8 = 0x14;
pub const CMD_RESET: u8 = 0x00;

/// Mode-select byte sent once during entry, single-wire variant.
pub const MODE_SELECT_ONE_WIRE: u8 = 0x00;
/// Mode-select byte sent once during entry, two-wire variant.
pub const MODE_SELECT_TWO_WIRE: u8 = 0x01;

/// Baud-rate codes accepted by the baud-rate-set command.
pub const RL78_BAUD_115200: u8 = 0x00;
pub const RL78_BAUD_250000: u8 = 0x01;
pub const RL78_BAUD_500000: u8 = 0x02;
pub const RL78_BAUD_1000000: u8 = 0x03;

/// Baud the target always boots at before negotiation.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Flash erase/program block size, RL78 family constant.
pub const FLASH_BLOCK_SIZE: u32 = 1024;

/// Base address of the data-flash region; used to turn the silicon
/// signature's data-flash end address into a size.
pub const DATA_FLASH_BASE: u32 = 0x000F_1000;

/// Settling delay per 1024 programmed bytes, in microseconds, plus a flat addend.
pub const PROGRAM_SETTLING_US_PER_KIB: u64 = 1500;
