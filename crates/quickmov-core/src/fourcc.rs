//! 4-byte ASCII codes identifying box and codec types

use serde::{Serialize, Serializer};
use std::fmt;

/// A fourcc: four ASCII bytes naming a box type or codec.
///
/// ISO-BMFF identifies every box and every sample-description entry with one
/// of these. Comparisons against byte-string literals (`fourcc == *b"moov"`)
/// work directly.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    /// Create a fourcc from its raw bytes.
    #[inline]
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Raw bytes of the code.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Lowercased copy, used as the codec-table key.
    ///
    /// Codec fourccs appear with mixed case in the wild (`fLaC`, `Opus`);
    /// table lookup normalises through this.
    #[inline]
    pub fn to_ascii_lowercase(&self) -> Self {
        let mut out = self.0;
        for b in &mut out {
            *b = b.to_ascii_lowercase();
        }
        Self(out)
    }

    /// Printable form: ASCII graphic characters kept, everything else shown
    /// as `.` so binary garbage in a corrupt file stays one glyph per byte.
    pub fn display_string(&self) -> String {
        self.0
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect()
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({})", self.display_string())
    }
}

impl From<[u8; 4]> for FourCc {
    #[inline]
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl From<&[u8; 4]> for FourCc {
    #[inline]
    fn from(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }
}

impl PartialEq<[u8; 4]> for FourCc {
    #[inline]
    fn eq(&self, other: &[u8; 4]) -> bool {
        &self.0 == other
    }
}

impl PartialEq<&[u8; 4]> for FourCc {
    #[inline]
    fn eq(&self, other: &&[u8; 4]) -> bool {
        &self.0 == *other
    }
}

impl Serialize for FourCc {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.display_string())
    }
}

/// Comprehensive test suite with Arrange-Act-Assert pattern
#[allow(
    unused_imports,
    unused_variables,
    unused_mut,
    dead_code,
    unused_comparisons,
    unused_must_use,
    unreachable_code,
    unused_parens,
    unused_assignments
)]
#[cfg(test)]
mod tests {
    include!("fourcc_test.rs");
}
