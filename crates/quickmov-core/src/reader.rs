//! Bounds-checked byte-level reader for container parsing
//!
//! [`ByteReader`] is the only way the demuxer touches file bytes: a cursor
//! over an immutable slice where every read proves `remaining() >= n`
//! before advancing. ISO-BMFF is big-endian throughout, so that is the
//! default; the endian flag exists for the occasional little-endian field
//! in legacy QuickTime payloads.
//!
//! `sub_reader(n)` carves out an independent cursor over the next `n`
//! bytes and advances the parent past them. Box payload parsing is always
//! scoped through a sub-reader, which makes "child crosses parent end"
//! impossible to express as a read.

use crate::{DemuxError, Result};

/// Byte order for multi-byte reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// Network byte order, the ISO-BMFF default
    #[default]
    Big,
    Little,
}

/// Stateful cursor over an immutable byte range.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    /// The window this reader may touch
    data: &'a [u8],
    /// Cursor within `data`
    pos: usize,
    /// Absolute file offset of `data[0]`, for error reporting
    base: u64,
    endian: Endian,
}

impl<'a> ByteReader<'a> {
    /// Create a big-endian reader over `data`.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
            endian: Endian::Big,
        }
    }

    /// Create a reader with an explicit byte order.
    #[inline]
    pub fn with_endian(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
            endian,
        }
    }

    /// Current position within this reader's window.
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    /// Absolute file offset of the cursor.
    #[inline]
    pub fn file_position(&self) -> u64 {
        self.base + self.pos as u64
    }

    /// Bytes left in the window.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Total window length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Byte order in effect.
    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Move the cursor to an absolute position within the window.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.data.len() as u64 {
            return Err(DemuxError::CorruptData {
                offset: self.base + pos,
                message: format!("seek to {} beyond window of {} bytes", pos, self.data.len()),
            });
        }
        self.pos = pos as usize;
        Ok(())
    }

    /// Advance the cursor by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.require(n)?;
        self.pos += n;
        Ok(())
    }

    /// Prove `n` bytes are available or fail with the shortfall.
    #[inline]
    fn require(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(DemuxError::CorruptData {
                offset: self.file_position(),
                message: format!("read of {} bytes exceeds remaining {}", n, self.remaining()),
            });
        }
        Ok(())
    }

    /// Take the next `n` bytes as a raw array-backed slice, advancing.
    #[inline]
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        self.require(n)?;
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Unsigned reads
    // ------------------------------------------------------------------

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        let b = [b[0], b[1]];
        Ok(match self.endian {
            Endian::Big => u16::from_be_bytes(b),
            Endian::Little => u16::from_le_bytes(b),
        })
    }

    /// 24-bit unsigned read, common in FullBox flags fields.
    #[inline]
    pub fn read_u24(&mut self) -> Result<u32> {
        let b = self.take(3)?;
        Ok(match self.endian {
            Endian::Big => ((b[0] as u32) << 16) | ((b[1] as u32) << 8) | b[2] as u32,
            Endian::Little => ((b[2] as u32) << 16) | ((b[1] as u32) << 8) | b[0] as u32,
        })
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        let b = [b[0], b[1], b[2], b[3]];
        Ok(match self.endian {
            Endian::Big => u32::from_be_bytes(b),
            Endian::Little => u32::from_le_bytes(b),
        })
    }

    #[inline]
    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let b = [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]];
        Ok(match self.endian {
            Endian::Big => u64::from_be_bytes(b),
            Endian::Little => u64::from_le_bytes(b),
        })
    }

    // ------------------------------------------------------------------
    // Signed reads
    // ------------------------------------------------------------------

    #[inline]
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    #[inline]
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    /// 24-bit signed read with sign extension.
    #[inline]
    pub fn read_i24(&mut self) -> Result<i32> {
        let raw = self.read_u24()?;
        // Sign-extend from bit 23
        Ok(((raw << 8) as i32) >> 8)
    }

    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    #[inline]
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    // ------------------------------------------------------------------
    // Floating point and fixed point
    // ------------------------------------------------------------------

    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    #[inline]
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Signed 16.16 fixed point (matrix entries, sample rates, dimensions).
    #[inline]
    pub fn read_fixed16_16(&mut self) -> Result<f64> {
        Ok(self.read_i32()? as f64 / 65536.0)
    }

    /// Signed 8.8 fixed point (legacy QuickTime volume/balance fields).
    #[inline]
    pub fn read_fixed8_8(&mut self) -> Result<f32> {
        Ok(self.read_i16()? as f32 / 256.0)
    }

    // ------------------------------------------------------------------
    // Slices, strings, fourccs
    // ------------------------------------------------------------------

    /// Borrow the next `n` bytes without copying.
    #[inline]
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Read `n` bytes as ASCII text; non-ASCII bytes are replaced.
    pub fn read_ascii(&mut self, n: usize) -> Result<String> {
        let raw = self.take(n)?;
        Ok(raw
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { '\u{FFFD}' })
            .collect())
    }

    /// Read a 4-byte type/codec code.
    #[inline]
    pub fn read_fourcc(&mut self) -> Result<crate::FourCc> {
        let b = self.take(4)?;
        Ok(crate::FourCc([b[0], b[1], b[2], b[3]]))
    }

    // ------------------------------------------------------------------
    // Peeks (non-advancing)
    // ------------------------------------------------------------------

    #[inline]
    pub fn peek_u8(&self) -> Result<u8> {
        self.require(1)?;
        Ok(self.data[self.pos])
    }

    #[inline]
    pub fn peek_u32(&self) -> Result<u32> {
        self.clone().read_u32()
    }

    #[inline]
    pub fn peek_fourcc(&self) -> Result<crate::FourCc> {
        self.clone().read_fourcc()
    }

    // ------------------------------------------------------------------
    // Scoping
    // ------------------------------------------------------------------

    /// Split off an independent cursor over the next `n` bytes.
    ///
    /// The parent advances past the window; the child reports absolute
    /// offsets relative to the same file origin.
    pub fn sub_reader(&mut self, n: usize) -> Result<ByteReader<'a>> {
        let base = self.file_position();
        let window = self.take(n)?;
        Ok(ByteReader {
            data: window,
            pos: 0,
            base,
            endian: self.endian,
        })
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
