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

//! Parsing of the 22-byte silicon signature response payload.

use crate::constants::DATA_FLASH_BASE;

/// Length in bytes of the silicon signature response payload.
pub const SIGNATURE_LEN: usize = 22;

/// Parsed silicon signature, per §3 of the protocol.
#[derive(Debug, Clone)]
pub struct SiliconSignature {
    /// 3-byte device code, as read off the wire.
    pub device_code: [u8; 3],
    /// 10 raw ASCII bytes of the device name, NUL-padded.
    pub device_name: [u8; 10],
    /// Last valid code-flash address.
    pub code_flash_end: u32,
    /// Last valid data-flash address, or `None` if the target has no
    /// data flash.
    pub data_flash_end: Option<u32>,
    /// 3-byte firmware version, as read off the wire.
    pub firmware_version: [u8; 3],
}

impl SiliconSignature {
    /// Parse a signature from its 22-byte wire payload.
    ///
    /// # Panics
    ///
    /// Panics if `payload` isn't exactly [`SIGNATURE_LEN`] bytes; callers
    /// are expected to have already framed the response to that length
    /// via `recv(SIGNATURE_LEN)`.
    pub fn parse(payload: &[u8]) -> SiliconSignature {
        assert_eq!(payload.len(), SIGNATURE_LEN, "silicon signature payload must be 22 bytes");

        let mut device_code = [0u8; 3];
        device_code.copy_from_slice(&payload[0..3]);

        let mut device_name = [0u8; 10];
        device_name.copy_from_slice(&payload[3..13]);

        let code_flash_end = le24(&payload[13..16]);
        let raw_data_flash_end = le24(&payload[16..19]);

        let mut firmware_version = [0u8; 3];
        firmware_version.copy_from_slice(&payload[19..22]);

        let data_flash_end = if raw_data_flash_end >= DATA_FLASH_BASE {
            Some(raw_data_flash_end)
        } else {
            None
        };

        SiliconSignature {
            device_code,
            device_name,
            code_flash_end,
            data_flash_end,
            firmware_version,
        }
    }

    /// Device name as a UTF-8 string, including any trailing NUL padding.
    pub fn device_name_str(&self) -> String {
        String::from_utf8_lossy(&self.device_name).into_owned()
    }

    /// Code-flash size in bytes.
    pub fn code_flash_size(&self) -> u32 {
        self.code_flash_end + 1
    }

    /// Data-flash size in bytes, `0` if absent.
    pub fn data_flash_size(&self) -> u32 {
        match self.data_flash_end {
            Some(end) => end - DATA_FLASH_BASE + 1,
            None => 0,
        }
    }
}

fn le24(bytes: &[u8]) -> u32 {
    u32::from(bytes[0]) | (u32::from(bytes[1]) << 8) | (u32::from(bytes[2]) << 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_spec_example() {
        let payload: [u8; SIGNATURE_LEN] = [
            0x03, 0x01, 0x0A, b'R', b'5', b'F', b'1', b'0', b'0', b'C', b'B',
            b'A', 0x00, 0xFF, 0x7F, 0x00, 0xFF, 0xFF, 0x00, 0x01, 0x02, 0x03,
        ];

        let sig = SiliconSignature::parse(&payload);

        assert_eq!(sig.device_name_str(), "R5F100CBA\0");
        assert_eq!(sig.code_flash_end, 0x007FFF);
        assert_eq!(sig.code_flash_size(), 0x8000);
        assert_eq!(sig.data_flash_size(), 0);
        assert!(sig.data_flash_end.is_none());
        assert_eq!(sig.firmware_version, [0x01, 0x02, 0x03]);
    }

    #[test]
    fn present_data_flash_computes_size() {
        let mut payload = [0u8; SIGNATURE_LEN];
        payload[16..19].copy_from_slice(&[0x00, 0x20, 0x0F]); // 0x000F2000
        let sig = SiliconSignature::parse(&payload);
        assert_eq!(sig.data_flash_end, Some(0x000F_2000));
        assert_eq!(sig.data_flash_size(), 0x1001);
    }
}
