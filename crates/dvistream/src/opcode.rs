//! The DVI opcode table.
//!
//! Values follow the DVI standard (`dvistd0`). Opcodes that come in
//! families of four widths are listed by their one-byte member; the wider
//! forms are `base + 1`, `base + 2` and `base + 3`.

use std::borrow::Cow;

pub const SET_CHAR_0: u8 = 0;
pub const SET_CHAR_127: u8 = 127;
pub const SET1: u8 = 128;
pub const SET_RULE: u8 = 132;
pub const PUT1: u8 = 133;
pub const PUT_RULE: u8 = 137;
pub const NOP: u8 = 138;
pub const BOP: u8 = 139;
pub const EOP: u8 = 140;
pub const PUSH: u8 = 141;
pub const POP: u8 = 142;
pub const RIGHT1: u8 = 143;
pub const W0: u8 = 147;
pub const W1: u8 = 148;
pub const X0: u8 = 152;
pub const X1: u8 = 153;
pub const DOWN1: u8 = 157;
pub const Y0: u8 = 161;
pub const Y1: u8 = 162;
pub const Z0: u8 = 166;
pub const Z1: u8 = 167;
pub const FNT_NUM_0: u8 = 171;
pub const FNT_NUM_63: u8 = 234;
pub const FNT1: u8 = 235;
pub const XXX1: u8 = 239;
pub const FNT_DEF1: u8 = 243;
pub const PRE: u8 = 247;
pub const POST: u8 = 248;
pub const POST_POST: u8 = 249;

/// Identification byte written in `pre` and `post_post`.
pub const DVI_ID: u8 = 2;

/// Padding byte that follows `post_post`.
pub const TRAILER: u8 = 223;

/// Mnemonic of `op`, or `None` for the undefined opcodes 250–255.
#[must_use]
pub fn name(op: u8) -> Option<Cow<'static, str>> {
    let fixed = match op {
        SET_CHAR_0..=SET_CHAR_127 => return Some(Cow::Owned(format!("set_char_{op}"))),
        FNT_NUM_0..=FNT_NUM_63 => {
            return Some(Cow::Owned(format!("fnt_num_{}", op - FNT_NUM_0)));
        }
        SET_RULE => "set_rule",
        PUT_RULE => "put_rule",
        NOP => "nop",
        BOP => "bop",
        EOP => "eop",
        PUSH => "push",
        POP => "pop",
        W0 => "w0",
        X0 => "x0",
        Y0 => "y0",
        Z0 => "z0",
        PRE => "pre",
        POST => "post",
        POST_POST => "post_post",
        _ => {
            let (family, base) = family(op)?;
            return Some(Cow::Owned(format!("{family}{}", op - base + 1)));
        }
    };
    Some(Cow::Borrowed(fixed))
}

/// Family name and one-byte base opcode of a four-width command.
pub(crate) fn family(op: u8) -> Option<(&'static str, u8)> {
    let found = match op {
        128..=131 => ("set", SET1),
        133..=136 => ("put", PUT1),
        143..=146 => ("right", RIGHT1),
        148..=151 => ("w", W1),
        153..=156 => ("x", X1),
        157..=160 => ("down", DOWN1),
        162..=165 => ("y", Y1),
        167..=170 => ("z", Z1),
        235..=238 => ("fnt", FNT1),
        239..=242 => ("xxx", XXX1),
        243..=246 => ("fnt_def", FNT_DEF1),
        _ => return None,
    };
    Some(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_cover_every_defined_opcode() {
        for op in 0..=POST_POST {
            assert!(name(op).is_some(), "opcode {op} has no name");
        }
        for op in 250..=255 {
            assert!(name(op).is_none(), "opcode {op} should be undefined");
        }
    }

    #[test]
    fn family_members_are_numbered_by_width() {
        assert_eq!(name(SET1).as_deref(), Some("set1"));
        assert_eq!(name(RIGHT1 + 2).as_deref(), Some("right3"));
        assert_eq!(name(Z1 + 3).as_deref(), Some("z4"));
        assert_eq!(name(FNT_DEF1).as_deref(), Some("fnt_def1"));
        assert_eq!(name(XXX1 + 3).as_deref(), Some("xxx4"));
        assert_eq!(name(FNT_NUM_0 + 5).as_deref(), Some("fnt_num_5"));
        assert_eq!(name(65).as_deref(), Some("set_char_65"));
    }
}
