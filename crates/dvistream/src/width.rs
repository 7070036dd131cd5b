//! Width selection for variable-length DVI parameters.

/// Number of bytes used by a variable-width parameter.
///
/// Four-width command families encode the width in the opcode: the one-byte
/// form is the base opcode and each extra byte adds one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntWidth {
    One,
    Two,
    Three,
    Four,
}

impl IntWidth {
    pub const ALL: [IntWidth; 4] = [IntWidth::One, IntWidth::Two, IntWidth::Three, IntWidth::Four];

    /// Narrowest width that holds the signed `value`.
    ///
    /// The thresholds compare the magnitude of `value`, so `-128` takes two
    /// bytes even though it fits a signed byte.
    #[must_use]
    pub const fn of(value: i32) -> Self {
        let magnitude = value.unsigned_abs();
        if magnitude >= 1 << 23 {
            IntWidth::Four
        } else if magnitude >= 1 << 15 {
            IntWidth::Three
        } else if magnitude >= 1 << 7 {
            IntWidth::Two
        } else {
            IntWidth::One
        }
    }

    /// Narrowest width that holds the unsigned `value`.
    #[must_use]
    pub const fn of_unsigned(value: u32) -> Self {
        if value > 0x00FF_FFFF {
            IntWidth::Four
        } else if value > 0xFFFF {
            IntWidth::Three
        } else if value > 0xFF {
            IntWidth::Two
        } else {
            IntWidth::One
        }
    }

    /// Width encoded by the opcode `base + offset`.
    #[must_use]
    pub const fn from_opcode_offset(offset: u8) -> Option<Self> {
        match offset {
            0 => Some(IntWidth::One),
            1 => Some(IntWidth::Two),
            2 => Some(IntWidth::Three),
            3 => Some(IntWidth::Four),
            _ => None,
        }
    }

    #[must_use]
    pub const fn opcode_offset(self) -> u8 {
        match self {
            IntWidth::One => 0,
            IntWidth::Two => 1,
            IntWidth::Three => 2,
            IntWidth::Four => 3,
        }
    }

    /// Payload length in bytes.
    #[must_use]
    pub const fn byte_len(self) -> usize {
        self.opcode_offset() as usize + 1
    }

    /// Largest unsigned value a length field of this width can carry.
    #[must_use]
    pub const fn max_unsigned(self) -> u32 {
        match self {
            IntWidth::One => 0xFF,
            IntWidth::Two => 0xFFFF,
            IntWidth::Three => 0x00FF_FFFF,
            // Four-byte lengths are signed in the format.
            IntWidth::Four => 0x7FFF_FFFF,
        }
    }
}
