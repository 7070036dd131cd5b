//! Typed DVI commands.
//!
//! Every opcode of the format maps to exactly one `Cmd` value. Commands that
//! exist in four widths keep the width they were read with (or should be
//! written with) in a `size` field, so decoding and re-encoding a stream
//! reproduces its bytes.

use std::{borrow::Cow, fmt};

use bstr::BString;

use crate::{opcode, width::IntWidth};

/// A single DVI command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Typeset character `0..=127` and move right.
    SetChar(u8),
    /// Typeset a character with a wider code and move right.
    Set { size: IntWidth, code: i32 },
    SetRule { height: i32, width: i32 },
    /// Typeset a character without moving.
    Put { size: IntWidth, code: i32 },
    PutRule { height: i32, width: i32 },
    Nop,
    /// Begin a page. `prev` points at the previous `bop`, or `-1`.
    Bop { counters: [i32; 10], prev: i32 },
    Eop,
    Push,
    Pop,
    Right { size: IntWidth, amount: i32 },
    W0,
    W { size: IntWidth, amount: i32 },
    X0,
    X { size: IntWidth, amount: i32 },
    Down { size: IntWidth, amount: i32 },
    Y0,
    Y { size: IntWidth, amount: i32 },
    Z0,
    Z { size: IntWidth, amount: i32 },
    /// Select font `0..=63`.
    FntNum(u8),
    Fnt { size: IntWidth, font: i32 },
    /// A special: opaque bytes for the output driver.
    Xxx {
        size: IntWidth,
        payload: BString,
    },
    FntDef {
        size: IntWidth,
        font: i32,
        checksum: u32,
        scale: i32,
        design_size: i32,
        area: BString,
        name: BString,
    },
    Pre {
        id: u8,
        num: u32,
        den: u32,
        mag: u32,
        comment: BString,
    },
    Post {
        prev: i32,
        num: u32,
        den: u32,
        mag: u32,
        max_height: i32,
        max_width: i32,
        max_stack: u16,
        pages: u16,
    },
    /// End of the postamble. The filler bytes that follow are not part of
    /// the command.
    PostPost { post: i32, id: u8 },
}

impl Cmd {
    /// The byte this command starts with.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        use crate::opcode as op;

        match *self {
            Cmd::SetChar(c) => c,
            Cmd::Set { size, .. } => op::SET1 + size.opcode_offset(),
            Cmd::SetRule { .. } => op::SET_RULE,
            Cmd::Put { size, .. } => op::PUT1 + size.opcode_offset(),
            Cmd::PutRule { .. } => op::PUT_RULE,
            Cmd::Nop => op::NOP,
            Cmd::Bop { .. } => op::BOP,
            Cmd::Eop => op::EOP,
            Cmd::Push => op::PUSH,
            Cmd::Pop => op::POP,
            Cmd::Right { size, .. } => op::RIGHT1 + size.opcode_offset(),
            Cmd::W0 => op::W0,
            Cmd::W { size, .. } => op::W1 + size.opcode_offset(),
            Cmd::X0 => op::X0,
            Cmd::X { size, .. } => op::X1 + size.opcode_offset(),
            Cmd::Down { size, .. } => op::DOWN1 + size.opcode_offset(),
            Cmd::Y0 => op::Y0,
            Cmd::Y { size, .. } => op::Y1 + size.opcode_offset(),
            Cmd::Z0 => op::Z0,
            Cmd::Z { size, .. } => op::Z1 + size.opcode_offset(),
            Cmd::FntNum(f) => op::FNT_NUM_0.wrapping_add(f),
            Cmd::Fnt { size, .. } => op::FNT1 + size.opcode_offset(),
            Cmd::Xxx { size, .. } => op::XXX1 + size.opcode_offset(),
            Cmd::FntDef { size, .. } => op::FNT_DEF1 + size.opcode_offset(),
            Cmd::Pre { .. } => op::PRE,
            Cmd::Post { .. } => op::POST,
            Cmd::PostPost { .. } => op::POST_POST,
        }
    }

    /// Mnemonic as used in the DVI standard, e.g. `set_char_65` or `right3`.
    ///
    /// Out-of-range `SetChar`/`FntNum` values still get a name even though
    /// they cannot be encoded.
    #[must_use]
    pub fn name(&self) -> Cow<'static, str> {
        match *self {
            Cmd::SetChar(c) => Cow::Owned(format!("set_char_{c}")),
            Cmd::FntNum(f) => Cow::Owned(format!("fnt_num_{f}")),
            _ => opcode::name(self.opcode()).unwrap_or(Cow::Borrowed("undefined")),
        }
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())?;
        match self {
            Cmd::Set { code, .. } | Cmd::Put { code, .. } => write!(f, " {code}"),
            Cmd::SetRule { height, width } | Cmd::PutRule { height, width } => {
                write!(f, " height={height} width={width}")
            }
            Cmd::Bop { counters, prev } => {
                f.write_str(" [")?;
                for (i, c) in counters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, "] prev={prev}")
            }
            Cmd::Right { amount, .. }
            | Cmd::W { amount, .. }
            | Cmd::X { amount, .. }
            | Cmd::Down { amount, .. }
            | Cmd::Y { amount, .. }
            | Cmd::Z { amount, .. } => write!(f, " {amount}"),
            Cmd::Fnt { font, .. } => write!(f, " {font}"),
            Cmd::Xxx { payload, .. } => write!(f, " {payload:?}"),
            Cmd::FntDef {
                font,
                checksum,
                scale,
                design_size,
                area,
                name,
                ..
            } => write!(
                f,
                " {font} checksum={checksum:#010x} scale={scale} design={design_size} {area}{name}"
            ),
            Cmd::Pre {
                id,
                num,
                den,
                mag,
                comment,
            } => write!(f, " id={id} num={num} den={den} mag={mag} {comment:?}"),
            Cmd::Post {
                prev,
                num,
                den,
                mag,
                max_height,
                max_width,
                max_stack,
                pages,
            } => write!(
                f,
                " prev={prev} num={num} den={den} mag={mag} height={max_height} \
                 width={max_width} stack={max_stack} pages={pages}"
            ),
            Cmd::PostPost { post, id } => write!(f, " post={post} id={id}"),
            Cmd::SetChar(_)
            | Cmd::Nop
            | Cmd::Eop
            | Cmd::Push
            | Cmd::Pop
            | Cmd::W0
            | Cmd::X0
            | Cmd::Y0
            | Cmd::Z0
            | Cmd::FntNum(_) => Ok(()),
        }
    }
}

/// With `serde`, a command serializes as its mnemonic under `cmd` plus its
/// operands under `args`. The width lives in the mnemonic (`right3`), and
/// commands without operands have no `args`:
///
/// ```json
/// {"cmd":"right3","args":{"amount":-1}}
/// {"cmd":"push"}
/// ```
#[cfg(any(test, feature = "serde"))]
impl serde::Serialize for Cmd {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let args = self.args();
        let mut st = serializer.serialize_struct("Cmd", 1 + usize::from(args.is_some()))?;
        st.serialize_field("cmd", &self.name())?;
        match args {
            Some(args) => st.serialize_field("args", &args)?,
            None => st.skip_field("args")?,
        }
        st.end()
    }
}

#[cfg(any(test, feature = "serde"))]
#[derive(serde::Serialize)]
#[serde(untagged)]
enum Args<'a> {
    Code {
        code: i32,
    },
    Rule {
        height: i32,
        width: i32,
    },
    Page {
        counters: &'a [i32; 10],
        prev: i32,
    },
    Amount {
        amount: i32,
    },
    Font {
        font: i32,
    },
    Special {
        #[serde(serialize_with = "lossy")]
        payload: &'a [u8],
    },
    FontDef {
        font: i32,
        checksum: u32,
        scale: i32,
        design_size: i32,
        #[serde(serialize_with = "lossy")]
        area: &'a [u8],
        #[serde(serialize_with = "lossy")]
        name: &'a [u8],
    },
    Pre {
        id: u8,
        num: u32,
        den: u32,
        mag: u32,
        #[serde(serialize_with = "lossy")]
        comment: &'a [u8],
    },
    Post {
        prev: i32,
        num: u32,
        den: u32,
        mag: u32,
        max_height: i32,
        max_width: i32,
        max_stack: u16,
        pages: u16,
    },
    PostPost {
        post: i32,
        id: u8,
    },
}

#[cfg(any(test, feature = "serde"))]
impl Cmd {
    fn args(&self) -> Option<Args<'_>> {
        let args = match self {
            Cmd::SetChar(c) => Args::Code {
                code: i32::from(*c),
            },
            Cmd::Set { code, .. } | Cmd::Put { code, .. } => Args::Code { code: *code },
            Cmd::SetRule { height, width } | Cmd::PutRule { height, width } => Args::Rule {
                height: *height,
                width: *width,
            },
            Cmd::Bop { counters, prev } => Args::Page {
                counters,
                prev: *prev,
            },
            Cmd::Right { amount, .. }
            | Cmd::W { amount, .. }
            | Cmd::X { amount, .. }
            | Cmd::Down { amount, .. }
            | Cmd::Y { amount, .. }
            | Cmd::Z { amount, .. } => Args::Amount { amount: *amount },
            Cmd::FntNum(f) => Args::Font {
                font: i32::from(*f),
            },
            Cmd::Fnt { font, .. } => Args::Font { font: *font },
            Cmd::Xxx { payload, .. } => Args::Special { payload },
            Cmd::FntDef {
                font,
                checksum,
                scale,
                design_size,
                area,
                name,
                ..
            } => Args::FontDef {
                font: *font,
                checksum: *checksum,
                scale: *scale,
                design_size: *design_size,
                area,
                name,
            },
            Cmd::Pre {
                id,
                num,
                den,
                mag,
                comment,
            } => Args::Pre {
                id: *id,
                num: *num,
                den: *den,
                mag: *mag,
                comment,
            },
            Cmd::Post {
                prev,
                num,
                den,
                mag,
                max_height,
                max_width,
                max_stack,
                pages,
            } => Args::Post {
                prev: *prev,
                num: *num,
                den: *den,
                mag: *mag,
                max_height: *max_height,
                max_width: *max_width,
                max_stack: *max_stack,
                pages: *pages,
            },
            Cmd::PostPost { post, id } => Args::PostPost {
                post: *post,
                id: *id,
            },
            Cmd::Nop
            | Cmd::Eop
            | Cmd::Push
            | Cmd::Pop
            | Cmd::W0
            | Cmd::X0
            | Cmd::Y0
            | Cmd::Z0 => return None,
        };
        Some(args)
    }
}

#[cfg(any(test, feature = "serde"))]
fn lossy<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    use bstr::ByteSlice;

    serializer.serialize_str(&bytes.to_str_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcodes_and_names_agree() {
        let cases = [
            (Cmd::SetChar(65), 65, "set_char_65"),
            (
                Cmd::Set {
                    size: IntWidth::Two,
                    code: 300,
                },
                129,
                "set2",
            ),
            (
                Cmd::Right {
                    size: IntWidth::Three,
                    amount: -1,
                },
                145,
                "right3",
            ),
            (Cmd::W0, 147, "w0"),
            (
                Cmd::Z {
                    size: IntWidth::Four,
                    amount: 0,
                },
                170,
                "z4",
            ),
            (Cmd::FntNum(63), 234, "fnt_num_63"),
            (
                Cmd::FntDef {
                    size: IntWidth::One,
                    font: 0,
                    checksum: 0,
                    scale: 0,
                    design_size: 0,
                    area: BString::from(""),
                    name: BString::from("cmr10"),
                },
                243,
                "fnt_def1",
            ),
            (Cmd::PostPost { post: 0, id: 2 }, 249, "post_post"),
        ];
        for (cmd, op, name) in cases {
            assert_eq!(cmd.opcode(), op, "{cmd:?}");
            assert_eq!(cmd.name(), name);
        }
    }

    #[test]
    fn display_shows_arguments() {
        let bop = Cmd::Bop {
            counters: [1, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            prev: -1,
        };
        assert_eq!(bop.to_string(), "bop [1 0 0 0 0 0 0 0 0 0] prev=-1");

        let def = Cmd::FntDef {
            size: IntWidth::One,
            font: 7,
            checksum: 0x1234_5678,
            scale: 655_360,
            design_size: 655_360,
            area: BString::from(""),
            name: BString::from("cmr10"),
        };
        assert_eq!(
            def.to_string(),
            "fnt_def1 7 checksum=0x12345678 scale=655360 design=655360 cmr10"
        );

        let special = Cmd::Xxx {
            size: IntWidth::One,
            payload: BString::from("color push"),
        };
        assert_eq!(special.to_string(), "xxx1 \"color push\"");
    }

    #[test]
    fn json_is_tagged_with_the_mnemonic() {
        let json = |cmd: &Cmd| serde_json::to_string(cmd).unwrap();

        assert_eq!(json(&Cmd::Eop), r#"{"cmd":"eop"}"#);
        assert_eq!(json(&Cmd::FntNum(3)), r#"{"cmd":"fnt_num_3","args":{"font":3}}"#);
        assert_eq!(
            json(&Cmd::SetChar(65)),
            r#"{"cmd":"set_char_65","args":{"code":65}}"#
        );
        assert_eq!(
            json(&Cmd::Y {
                size: IntWidth::Two,
                amount: -300,
            }),
            r#"{"cmd":"y2","args":{"amount":-300}}"#
        );
        // payloads that are not UTF-8 are shown lossily
        assert_eq!(
            json(&Cmd::Xxx {
                size: IntWidth::One,
                payload: BString::from(&b"a\xFFb"[..]),
            }),
            "{\"cmd\":\"xxx1\",\"args\":{\"payload\":\"a\u{FFFD}b\"}}"
        );
    }
}
