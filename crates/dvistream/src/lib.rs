//! Buffered encoding and decoding of DVI (device-independent) page
//! description streams, as produced by TeX.
//!
//! [`DviWriter`] accumulates commands in a fixed buffer and flushes it to any
//! [`std::io::Write`] sink one half at a time, which keeps memory bounded
//! while still letting the caller refer to absolute stream positions and
//! cancel an empty `push`/`pop` pair. [`DviReader`] turns a byte stream back
//! into [`Cmd`] values, and [`Interpreter`] replays them while tracking
//! the machine registers, the `push`/`pop` stack and the defined fonts.
//!
//! ```rust
//! use dvistream::{Cmd, DviReader, DviWriter};
//!
//! let mut w = DviWriter::new(Vec::new());
//! w.write_preamble(1000, b"example")?;
//! let bop = w.begin_page([1, 0, 0, 0, 0, 0, 0, 0, 0, 0], -1)?;
//! w.write_font_definition(0, 0, 655_360, 655_360, b"", b"cmr10")?;
//! w.select_font(0)?;
//! let group = w.push()?;
//! w.move_right(65_536)?;
//! w.set_char(u32::from(b'A'))?;
//! w.write_bracket_pop(group)?;
//! w.write_cmd(&Cmd::Eop)?;
//! assert_eq!(bop, 15 + 7);
//! assert_eq!(w.page_count(), 1);
//!
//! let bytes = w.finish()?;
//! let cmds = DviReader::new(&bytes[..]).read_all()?;
//! assert_eq!(cmds.last().map(|(_, cmd)| cmd), Some(&Cmd::Eop));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![allow(missing_docs)]
#![forbid(unsafe_code)]

mod cmd;
mod encode;
mod error;
mod interp;
pub mod opcode;
mod options;
mod reader;
mod width;
mod writer;

#[cfg(test)]
mod tests;

pub use cmd::Cmd;
pub use error::{DviError, InterpretError, ProtocolViolation, ReadError};
pub use interp::{CharWidth, DEFAULT_RESOLUTION, FontDef, Interpreter, Registers, code_as_width};
pub use options::WriterOptions;
pub use reader::DviReader;
pub use width::IntWidth;
pub use writer::DviWriter;
