use crate::DviError;

/// Configuration for a [`DviWriter`](crate::DviWriter) session.
///
/// # Examples
///
/// ```rust
/// use dvistream::{DviWriter, WriterOptions};
///
/// let options = WriterOptions {
///     buffer_size: 1024,
/// };
/// let writer = DviWriter::with_options(Vec::new(), options).unwrap();
/// assert_eq!(writer.pos(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Size of the output buffer in bytes.
    ///
    /// The buffer is flushed one half at a time, so at most this many bytes
    /// are held in memory and the most recent `buffer_size / 2` bytes can
    /// always be rewritten. Must be even and at least 8.
    ///
    /// # Default
    ///
    /// `16384`
    pub buffer_size: usize,
}

impl WriterOptions {
    pub const DEFAULT_BUFFER_SIZE: usize = 16_384;

    pub(crate) fn validate(self) -> Result<Self, DviError> {
        if self.buffer_size < 8 || self.buffer_size % 2 != 0 {
            return Err(DviError::InvalidBufferSize {
                size: self.buffer_size,
            });
        }
        Ok(self)
    }
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
        }
    }
}
