//! Double-buffered DVI stream encoder.
//!
//! Buffer discipline
//! - The buffer holds `buffer_size` bytes split into two halves,
//!   `[0, half)` and `[half, size)`. Bytes are written at `ptr`; when `ptr`
//!   reaches `limit` one half is flushed to the sink and writing continues.
//! - With `limit == size` the caller is filling the whole buffer (or its
//!   second half). On overflow the first half goes out, `ptr` restarts at 0
//!   and `limit` drops to `half`, while the second half stays buffered.
//! - With `limit == half` the caller is refilling the first half. On
//!   overflow the second half goes out and `limit` returns to `size`;
//!   `ptr` continues from `half`.
//! - `offset` advances by a whole buffer each time `ptr` restarts at 0, so
//!   `offset + ptr` is always the absolute position of the next byte.
//!
//! Bracket elision
//! - `write_bracket_pop` drops a `push` that was the last byte written,
//!   instead of emitting a `pop`. This only works while the `push` is still
//!   in the active region, i.e. `ptr > 0`.

use std::{fmt, fs::File, io::Write, path::Path};

use tracing::{debug, trace};

use crate::{
    DviError, ProtocolViolation, WriterOptions,
    opcode::{FNT_DEF1, POP, PUSH},
    width::IntWidth,
};

/// Encodes a DVI command stream into a byte sink through a fixed buffer.
///
/// A writer serves a single output session. [`finish`](Self::finish) writes
/// whatever is still buffered and returns the sink; dropping the writer
/// without finishing discards the buffered bytes.
///
/// # Examples
///
/// ```rust
/// use dvistream::{DviWriter, opcode};
///
/// let mut w = DviWriter::new(Vec::new());
/// w.write_byte(opcode::PUSH)?;
/// let loc = w.pos();
/// w.write_bracket_pop(loc)?;
/// w.write_variable_command(opcode::RIGHT1, -129)?;
/// let bytes = w.finish()?;
/// assert_eq!(bytes, [opcode::RIGHT1 + 1, 0xFF, 0x7F]);
/// # Ok::<(), dvistream::DviError>(())
/// ```
pub struct DviWriter<W: Write> {
    sink: W,

    buf: Box<[u8]>,
    half_buf: usize,
    limit: usize,
    ptr: usize,

    offset: u64,
    gone: u64,
    total_pages: u32,

    font: Option<u32>,
    h: i32,
    v: i32,
}

impl DviWriter<File> {
    /// Create `path` and open an encoding session on it.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, DviError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        debug!(path = %path.display(), "opened dvi output");
        Ok(Self::new(file))
    }
}

impl<W: Write> DviWriter<W> {
    /// Open a session on `sink` with the default options.
    #[must_use]
    pub fn new(sink: W) -> Self {
        Self::from_valid_options(sink, WriterOptions::default())
    }

    pub fn with_options(sink: W, options: WriterOptions) -> Result<Self, DviError> {
        Ok(Self::from_valid_options(sink, options.validate()?))
    }

    fn from_valid_options(sink: W, options: WriterOptions) -> Self {
        let size = options.buffer_size;
        Self {
            sink,
            // One guard byte past the end.
            buf: vec![0; size + 1].into_boxed_slice(),
            half_buf: size / 2,
            limit: size,
            ptr: 0,
            offset: 0,
            gone: 0,
            total_pages: 0,
            font: None,
            h: 0,
            v: 0,
        }
    }

    fn buf_size(&self) -> usize {
        self.buf.len() - 1
    }

    /// Append one byte to the stream.
    pub fn write_byte(&mut self, b: u8) -> Result<(), DviError> {
        debug_assert!(self.ptr < self.limit && self.limit <= self.buf_size());
        self.buf[self.ptr] = b;
        self.ptr += 1;
        if self.ptr == self.limit {
            self.swap()?;
        }
        Ok(())
    }

    fn swap(&mut self) -> Result<(), DviError> {
        let size = self.buf_size();
        if self.limit == size {
            self.write_range(0, self.half_buf)?;
            self.limit = self.half_buf;
            self.offset += size as u64;
            self.ptr = 0;
        } else {
            self.write_range(self.half_buf, size)?;
            self.limit = size;
        }
        self.gone += self.half_buf as u64;
        #[cfg(any(test, feature = "fuzzing"))]
        assert!(
            self.pos() - self.gone <= size as u64,
            "Internal error: more bytes pending than the buffer holds"
        );
        trace!(gone = self.gone, offset = self.offset, "flushed half buffer");
        Ok(())
    }

    fn write_range(&mut self, start: usize, end: usize) -> Result<(), DviError> {
        self.sink.write_all(&self.buf[start..end])?;
        Ok(())
    }

    /// Write out every buffered byte, oldest half first.
    fn flush_final(&mut self) -> Result<(), DviError> {
        let size = self.buf_size();
        if self.limit == self.half_buf {
            self.write_range(self.half_buf, size)?;
            self.gone += (size - self.half_buf) as u64;
        }
        if self.ptr > 0 {
            self.write_range(0, self.ptr)?;
            self.gone += self.ptr as u64;
        }
        Ok(())
    }

    /// Flush the buffer and the sink, ending the session.
    ///
    /// Returns the sink so callers can close or inspect it.
    pub fn finish(mut self) -> Result<W, DviError> {
        self.flush_final()?;
        self.sink.flush()?;
        debug!(
            bytes = self.gone,
            pages = self.total_pages,
            "finished dvi output"
        );
        Ok(self.sink)
    }

    /// Write `x` as four big-endian bytes.
    pub fn write_u32_be(&mut self, x: u32) -> Result<(), DviError> {
        for b in x.to_be_bytes() {
            self.write_byte(b)?;
        }
        Ok(())
    }

    /// Write the two's-complement bytes of `x`, most significant first.
    pub fn write_i32_be(&mut self, x: i32) -> Result<(), DviError> {
        for b in x.to_be_bytes() {
            self.write_byte(b)?;
        }
        Ok(())
    }

    /// Write the low `width` bytes of `value`, most significant first.
    pub(crate) fn write_param(&mut self, width: IntWidth, value: i32) -> Result<(), DviError> {
        let bytes = value.to_be_bytes();
        for &b in &bytes[4 - width.byte_len()..] {
            self.write_byte(b)?;
        }
        Ok(())
    }

    /// Close a group opened at `location`.
    ///
    /// `location` is the value of [`pos`](Self::pos) right after the matching
    /// `push` was written. If nothing has been written since, the `push` is
    /// erased and no `pop` is emitted.
    pub fn write_bracket_pop(&mut self, location: u64) -> Result<(), DviError> {
        if location == self.pos() && self.ptr > 0 {
            let found = self.buf[self.ptr - 1];
            if found != PUSH {
                return Err(ProtocolViolation::UnmatchedPop { found }.into());
            }
            self.ptr -= 1;
            return Ok(());
        }
        self.write_byte(POP)
    }

    /// Write `base + k` followed by `value` in the narrowest of the four
    /// widths `k + 1` that holds it.
    ///
    /// `base` is the one-byte member of a command family. The opcode byte
    /// wraps around past 255.
    pub fn write_variable_command(&mut self, base: u8, value: i32) -> Result<(), DviError> {
        self.write_sized_command(base, IntWidth::of(value), value)
    }

    pub(crate) fn write_sized_command(
        &mut self,
        base: u8,
        width: IntWidth,
        value: i32,
    ) -> Result<(), DviError> {
        self.write_byte(base.wrapping_add(width.opcode_offset()))?;
        self.write_param(width, value)
    }

    /// Write a `fnt_def1` record.
    ///
    /// `area` and `name` are copied verbatim and must each be at most 255
    /// bytes long.
    pub fn write_font_definition(
        &mut self,
        font_id: u8,
        checksum: u32,
        size: i32,
        design_size: i32,
        area: &[u8],
        name: &[u8],
    ) -> Result<(), DviError> {
        self.write_font_def_sized(
            IntWidth::One,
            i32::from(font_id),
            checksum,
            size,
            design_size,
            area,
            name,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn write_font_def_sized(
        &mut self,
        width: IntWidth,
        font: i32,
        checksum: u32,
        size: i32,
        design_size: i32,
        area: &[u8],
        name: &[u8],
    ) -> Result<(), DviError> {
        let area_len =
            u8::try_from(area.len()).map_err(|_| ProtocolViolation::AreaTooLong { len: area.len() })?;
        let name_len =
            u8::try_from(name.len()).map_err(|_| ProtocolViolation::NameTooLong { len: name.len() })?;

        self.write_sized_command(FNT_DEF1, width, font)?;
        self.write_u32_be(checksum)?;
        self.write_i32_be(size)?;
        self.write_i32_be(design_size)?;
        self.write_byte(area_len)?;
        self.write_byte(name_len)?;
        self.write_bytes(area)?;
        self.write_bytes(name)
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), DviError> {
        for &b in bytes {
            self.write_byte(b)?;
        }
        Ok(())
    }

    /// Absolute position of the next byte in the output stream.
    #[must_use]
    pub fn pos(&self) -> u64 {
        self.offset + self.ptr as u64
    }

    /// Number of bytes handed to the sink so far.
    #[must_use]
    pub fn bytes_flushed(&self) -> u64 {
        self.gone
    }

    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.total_pages
    }

    /// Count one more page. Called when a `bop` is written.
    pub fn add_page(&mut self) {
        self.total_pages += 1;
    }

    /// Font selected in the output, as last recorded by the caller.
    #[must_use]
    pub fn current_font(&self) -> Option<u32> {
        self.font
    }

    pub fn set_current_font(&mut self, font: Option<u32>) {
        self.font = font;
    }

    /// Horizontal position the output is known to be at.
    #[must_use]
    pub fn h(&self) -> i32 {
        self.h
    }

    pub fn set_h(&mut self, h: i32) {
        self.h = h;
    }

    /// Vertical position the output is known to be at.
    #[must_use]
    pub fn v(&self) -> i32 {
        self.v
    }

    pub fn set_v(&mut self, v: i32) {
        self.v = v;
    }

    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buf_size()
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }
}

impl<W: Write> fmt::Debug for DviWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DviWriter")
            .field("buffer_size", &self.buf_size())
            .field("limit", &self.limit)
            .field("ptr", &self.ptr)
            .field("offset", &self.offset)
            .field("gone", &self.gone)
            .field("total_pages", &self.total_pages)
            .field("font", &self.font)
            .field("h", &self.h)
            .field("v", &self.v)
            .finish_non_exhaustive()
    }
}
