use flate2::Crc;

use crate::reader::{BigEndianReader, BigEndianWriter};
use crate::region::Region;

fn assert_len(buffer: &[u8], region: Region) {
    assert_eq!(
        buffer.len(),
        region.buffer_len(),
        "{region} checksum over a buffer of the wrong length"
    );
}

/// CRC-32 of everything before the checksum field.
pub fn compute(buffer: &[u8], region: Region) -> u32 {
    assert_len(buffer, region);
    let range = region.layout().checksum_range();
    let mut crc = Crc::new();
    crc.update(&buffer[range.as_range()]);
    crc.sum()
}

pub fn stored(buffer: &[u8], region: Region) -> u32 {
    assert_len(buffer, region);
    BigEndianReader::new(buffer).read_u32(region.layout().checksum_offset())
}

pub fn verify(buffer: &[u8], region: Region) -> bool {
    stored(buffer, region) == compute(buffer, region)
}

/// Write the freshly computed checksum and return it.
pub fn update(buffer: &mut [u8], region: Region) -> u32 {
    let sum = compute(buffer, region);
    BigEndianWriter::new(buffer).write_u32(region.layout().checksum_offset(), sum);
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(region: Region) -> Vec<u8> {
        let mut bytes = vec![0u8; region.buffer_len()];
        bytes[..4].copy_from_slice(&region.signature());
        bytes
    }

    #[test]
    fn crc32_matches_reference_vector() {
        let mut crc = Crc::new();
        crc.update(b"123456789");
        assert_eq!(crc.sum(), 0xCBF4_3926);
    }

    #[test]
    fn update_then_verify() {
        for region in Region::ALL {
            let mut bytes = blank(region);
            bytes[0x100] = 0x5A;
            assert!(!verify(&bytes, region));
            let sum = update(&mut bytes, region);
            assert!(verify(&bytes, region));
            assert_eq!(stored(&bytes, region), sum);
        }
    }

    #[test]
    fn padding_is_not_covered() {
        let region = Region::NtscU;
        let mut bytes = blank(region);
        update(&mut bytes, region);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(verify(&bytes, region));
    }

    #[test]
    fn stored_value_is_big_endian() {
        let region = Region::Pal;
        let mut bytes = blank(region);
        let sum = update(&mut bytes, region);
        let at = region.layout().checksum_offset();
        assert_eq!(bytes[at..at + 4], sum.to_be_bytes());
    }
}
