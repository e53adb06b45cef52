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

//! Host-side helpers that don't need a live session: the whole-image
//! checksum used to sanity-check a file before programming it, and a
//! status-byte formatter for logging.

use crate::constants::ACK;

/// Host-side 16-bit checksum of an image, for comparison against
/// [`crate::Session::checksum`]'s on-target result before trusting a
/// program operation. Computed as the two's-complement negation of the
/// sum of all bytes, wrapped to 16 bits -- the same formula the target
/// uses internally, just over the whole buffer instead of one block.
pub fn checksum_image(data: &[u8]) -> u16 {
    let sum = data
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)));
    0u16.wrapping_sub(sum)
}

/// Render a raw status byte for log messages.
pub fn status_code_to_str(status: u8) -> &'static str {
    match status {
        ACK => "ACK",
        crate::constants::BLANK_ERROR => "BLANK_ERROR",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_image_matches_spec_example() {
        assert_eq!(checksum_image(&[0x01, 0x02, 0x03, 0x04]), 0xFFF6);
    }

    #[test]
    fn empty_image_checksums_to_zero() {
        assert_eq!(checksum_image(&[]), 0);
    }
}
