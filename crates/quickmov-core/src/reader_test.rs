// ByteReader tests
//
// Arrange-Act-Assert pattern. Fixtures are hand-written byte arrays with
// known big-endian and little-endian interpretations.

use super::*;
use crate::DemuxError;

// ============================================================================
// Fixtures
// ============================================================================

/// Eight ascending bytes: 0x01 .. 0x08
fn ascending() -> [u8; 8] {
    [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
}

// ============================================================================
// Position and bounds Tests
// ============================================================================

#[cfg(test)]
mod reader_bounds_tests {
    use super::*;

    #[test]
    fn test_new_reader_starts_at_zero() {
        // Arrange
        let data = ascending();

        // Act
        let reader = ByteReader::new(&data);

        // Assert
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.remaining(), 8);
        assert!(!reader.is_empty());
    }

    #[test]
    fn test_read_past_end_is_corrupt_data() {
        // Arrange
        let data = [0x01, 0x02];
        let mut reader = ByteReader::new(&data);

        // Act
        let result = reader.read_u32();

        // Assert
        match result {
            Err(DemuxError::CorruptData { offset, message }) => {
                assert_eq!(offset, 0);
                assert!(message.contains("4 bytes"));
                assert!(message.contains("remaining 2"));
            }
            other => panic!("expected CorruptData, got {:?}", other),
        }
        // Failed read does not advance
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_seek_and_skip() {
        // Arrange
        let data = ascending();
        let mut reader = ByteReader::new(&data);

        // Act
        reader.seek(4).unwrap();
        let v = reader.read_u8().unwrap();
        reader.skip(2).unwrap();

        // Assert
        assert_eq!(v, 0x05);
        assert_eq!(reader.position(), 7);
        assert!(reader.seek(9).is_err());
        assert!(reader.skip(2).is_err());
    }

    #[test]
    fn test_seek_to_end_is_allowed() {
        let data = ascending();
        let mut reader = ByteReader::new(&data);
        reader.seek(8).unwrap();
        assert!(reader.is_empty());
    }
}

// ============================================================================
// Integer read Tests
// ============================================================================

#[cfg(test)]
mod reader_integer_tests {
    use super::*;

    #[test]
    fn test_big_endian_reads() {
        // Arrange
        let data = ascending();
        let mut reader = ByteReader::new(&data);

        // Act + Assert
        assert_eq!(reader.read_u16().unwrap(), 0x0102);
        assert_eq!(reader.read_u32().unwrap(), 0x0304_0506);
        assert_eq!(reader.read_u16().unwrap(), 0x0708);
    }

    #[test]
    fn test_little_endian_reads() {
        // Arrange
        let data = ascending();
        let mut reader = ByteReader::with_endian(&data, Endian::Little);

        // Act + Assert
        assert_eq!(reader.read_u16().unwrap(), 0x0201);
        assert_eq!(reader.read_u32().unwrap(), 0x0605_0403);
    }

    #[test]
    fn test_read_u24() {
        let data = [0x00, 0x01, 0x02];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u24().unwrap(), 0x000102);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_read_u64_round_trip_value() {
        let data = 0x0011_2233_4455_6677_u64.to_be_bytes();
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u64().unwrap(), 0x0011_2233_4455_6677);
    }

    #[test]
    fn test_signed_reads_sign_extend() {
        // Arrange: -1 in 8, 16, 24 and 32 bit widths
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut reader = ByteReader::new(&data);

        // Act + Assert
        assert_eq!(reader.read_i8().unwrap(), -1);
        assert_eq!(reader.read_i16().unwrap(), -1);
        assert_eq!(reader.read_i24().unwrap(), -1);
        assert_eq!(reader.read_i32().unwrap(), -1);
    }

    #[test]
    fn test_read_i24_positive_stays_positive() {
        let data = [0x7F, 0xFF, 0xFF];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_i24().unwrap(), 0x7F_FFFF);
    }
}

// ============================================================================
// Fixed point, float, string Tests
// ============================================================================

#[cfg(test)]
mod reader_value_tests {
    use super::*;

    #[test]
    fn test_fixed16_16() {
        // Arrange: 44100.0 as 16.16 (the canonical audio sample rate form)
        let raw = (44_100_u32) << 16;
        let data = raw.to_be_bytes();
        let mut reader = ByteReader::new(&data);

        // Act + Assert
        assert_eq!(reader.read_fixed16_16().unwrap(), 44_100.0);
    }

    #[test]
    fn test_fixed16_16_fractional() {
        let data = 0x0001_8000_u32.to_be_bytes(); // 1.5
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_fixed16_16().unwrap(), 1.5);
    }

    #[test]
    fn test_fixed8_8() {
        let data = 0x0180_u16.to_be_bytes(); // 1.5
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_fixed8_8().unwrap(), 1.5);
    }

    #[test]
    fn test_read_f32() {
        let data = 2.5_f32.to_bits().to_be_bytes();
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_f32().unwrap(), 2.5);
    }

    #[test]
    fn test_read_f64() {
        let data = (-0.125_f64).to_bits().to_be_bytes();
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_f64().unwrap(), -0.125);
    }

    #[test]
    fn test_read_ascii_replaces_non_ascii() {
        let data = [b'i', b's', 0xC3, b'm'];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_ascii(4).unwrap(), "is\u{FFFD}m");
    }

    #[test]
    fn test_read_bytes_is_zero_copy_view() {
        // Arrange
        let data = ascending();
        let mut reader = ByteReader::new(&data);
        reader.skip(2).unwrap();

        // Act
        let view = reader.read_bytes(3).unwrap();

        // Assert: same underlying memory, not a copy
        assert_eq!(view, &data[2..5]);
        assert!(std::ptr::eq(view.as_ptr(), data[2..].as_ptr()));
    }

    #[test]
    fn test_read_fourcc() {
        let data = *b"moov....";
        let mut reader = ByteReader::new(&data);
        let code = reader.read_fourcc().unwrap();
        assert_eq!(code, *b"moov");
        assert_eq!(reader.position(), 4);
    }
}

// ============================================================================
// Peek and sub-reader Tests
// ============================================================================

#[cfg(test)]
mod reader_scope_tests {
    use super::*;

    #[test]
    fn test_peeks_do_not_advance() {
        // Arrange
        let data = *b"ftypisom";
        let reader = ByteReader::new(&data);

        // Act
        let c1 = reader.peek_fourcc().unwrap();
        let b = reader.peek_u8().unwrap();
        let w = reader.peek_u32().unwrap();

        // Assert
        assert_eq!(c1, *b"ftyp");
        assert_eq!(b, b'f');
        assert_eq!(w, u32::from_be_bytes(*b"ftyp"));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_sub_reader_scopes_and_advances_parent() {
        // Arrange
        let data = ascending();
        let mut parent = ByteReader::new(&data);
        parent.skip(2).unwrap();

        // Act
        let mut child = parent.sub_reader(4).unwrap();

        // Assert: parent has moved past the window
        assert_eq!(parent.position(), 6);
        assert_eq!(parent.remaining(), 2);

        // Child is independent, bounded, and offset-aware
        assert_eq!(child.remaining(), 4);
        assert_eq!(child.file_position(), 2);
        assert_eq!(child.read_u32().unwrap(), 0x0304_0506);
        assert!(child.read_u8().is_err());
    }

    #[test]
    fn test_sub_reader_error_offsets_are_absolute() {
        // Arrange
        let data = ascending();
        let mut parent = ByteReader::new(&data);
        parent.skip(4).unwrap();
        let mut child = parent.sub_reader(2).unwrap();
        child.skip(2).unwrap();

        // Act
        let err = child.read_u8().unwrap_err();

        // Assert
        match err {
            DemuxError::CorruptData { offset, .. } => assert_eq!(offset, 6),
            other => panic!("expected CorruptData, got {:?}", other),
        }
    }

    #[test]
    fn test_sub_reader_longer_than_remaining_fails() {
        let data = [0u8; 4];
        let mut parent = ByteReader::new(&data);
        assert!(parent.sub_reader(5).is_err());
    }
}
