use std::io;

use thiserror::Error;

/// Errors raised while encoding a DVI stream.
#[derive(Error, Debug)]
pub enum DviError {
    /// The byte sink failed. The session cannot continue.
    #[error("dvi sink error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol violation: {0}")]
    ProtocolViolation(#[from] ProtocolViolation),
    /// The configured buffer cannot be split into two equal halves.
    #[error("invalid buffer size {size}: must be even and at least 8")]
    InvalidBufferSize { size: usize },
}

/// A caller handed the encoder something the DVI format cannot represent.
///
/// Nothing is written when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("font area is {len} bytes, at most 255 are allowed")]
    AreaTooLong { len: usize },
    #[error("font name is {len} bytes, at most 255 are allowed")]
    NameTooLong { len: usize },
    #[error("pop would erase byte {found} instead of a push")]
    UnmatchedPop { found: u8 },
    #[error("character {code} has no set_char opcode")]
    CharOutOfRange { code: u8 },
    #[error("font {font} has no fnt_num opcode")]
    FontNumberOutOfRange { font: u8 },
    #[error("special of {len} bytes does not fit a {width}-byte length")]
    SpecialTooLong { len: usize, width: usize },
    #[error("comment is {len} bytes, at most 255 are allowed")]
    CommentTooLong { len: usize },
}

/// Errors raised while decoding a DVI stream.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("could not read dvi stream: {0}")]
    Io(#[from] io::Error),
    #[error("stream ends inside command 0x{opcode:02x} at offset {offset}")]
    UnexpectedEof { opcode: u8, offset: u64 },
    #[error("undefined opcode 0x{opcode:02x} at offset {offset}")]
    UndefinedOpcode { opcode: u8, offset: u64 },
}

/// Errors raised while interpreting a command stream.
#[derive(Error, Debug)]
pub enum InterpretError {
    #[error("could not write trace: {0}")]
    Io(#[from] io::Error),
    #[error("pop without a matching push")]
    UnbalancedPop,
    #[error("font {font} selected before it was defined")]
    UndefinedFont { font: i32 },
}
