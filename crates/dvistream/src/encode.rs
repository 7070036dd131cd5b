//! Command-level encoding on top of the byte primitives of [`DviWriter`].

use std::io::Write;

use crate::{
    Cmd, DviError, DviWriter, ProtocolViolation,
    opcode::{
        BOP, DOWN1, DVI_ID, EOP, FNT_NUM_0, FNT1, NOP, POP, POST, POST_POST, PRE, PUSH, PUT_RULE,
        PUT1, RIGHT1, SET_RULE, SET1, TRAILER, W0, W1, X0, X1, XXX1, Y0, Y1, Z0, Z1,
    },
    width::IntWidth,
};

impl<W: Write> DviWriter<W> {
    /// Encode `cmd` exactly as described, including its width.
    ///
    /// Fields that do not fit their encoding are rejected before anything is
    /// written. A `bop` counts a page; a `post_post` is followed by the
    /// `223` filler that pads the stream to a multiple of four bytes.
    pub fn write_cmd(&mut self, cmd: &Cmd) -> Result<(), DviError> {
        match cmd {
            Cmd::SetChar(c) => {
                if *c > 127 {
                    return Err(ProtocolViolation::CharOutOfRange { code: *c }.into());
                }
                self.write_byte(*c)
            }
            Cmd::Set { size, code } => self.write_sized_command(SET1, *size, *code),
            Cmd::SetRule { height, width } => self.write_rule(SET_RULE, *height, *width),
            Cmd::Put { size, code } => self.write_sized_command(PUT1, *size, *code),
            Cmd::PutRule { height, width } => self.write_rule(PUT_RULE, *height, *width),
            Cmd::Nop => self.write_byte(NOP),
            Cmd::Bop { counters, prev } => {
                self.write_byte(BOP)?;
                for &c in counters {
                    self.write_i32_be(c)?;
                }
                self.write_i32_be(*prev)?;
                self.add_page();
                Ok(())
            }
            Cmd::Eop => self.write_byte(EOP),
            Cmd::Push => self.write_byte(PUSH),
            Cmd::Pop => self.write_byte(POP),
            Cmd::Right { size, amount } => self.write_sized_command(RIGHT1, *size, *amount),
            Cmd::W0 => self.write_byte(W0),
            Cmd::W { size, amount } => self.write_sized_command(W1, *size, *amount),
            Cmd::X0 => self.write_byte(X0),
            Cmd::X { size, amount } => self.write_sized_command(X1, *size, *amount),
            Cmd::Down { size, amount } => self.write_sized_command(DOWN1, *size, *amount),
            Cmd::Y0 => self.write_byte(Y0),
            Cmd::Y { size, amount } => self.write_sized_command(Y1, *size, *amount),
            Cmd::Z0 => self.write_byte(Z0),
            Cmd::Z { size, amount } => self.write_sized_command(Z1, *size, *amount),
            Cmd::FntNum(f) => {
                if *f > 63 {
                    return Err(ProtocolViolation::FontNumberOutOfRange { font: *f }.into());
                }
                self.write_byte(FNT_NUM_0 + f)
            }
            Cmd::Fnt { size, font } => self.write_sized_command(FNT1, *size, *font),
            Cmd::Xxx { size, payload } => {
                let len = i32::try_from(payload.len())
                    .ok()
                    .filter(|n| n.unsigned_abs() <= size.max_unsigned())
                    .ok_or(ProtocolViolation::SpecialTooLong {
                        len: payload.len(),
                        width: size.byte_len(),
                    })?;
                self.write_sized_command(XXX1, *size, len)?;
                self.write_bytes(payload)
            }
            Cmd::FntDef {
                size,
                font,
                checksum,
                scale,
                design_size,
                area,
                name,
            } => self.write_font_def_sized(*size, *font, *checksum, *scale, *design_size, area, name),
            Cmd::Pre {
                id,
                num,
                den,
                mag,
                comment,
            } => {
                let len = u8::try_from(comment.len()).map_err(|_| {
                    ProtocolViolation::CommentTooLong {
                        len: comment.len(),
                    }
                })?;
                self.write_byte(PRE)?;
                self.write_byte(*id)?;
                self.write_u32_be(*num)?;
                self.write_u32_be(*den)?;
                self.write_u32_be(*mag)?;
                self.write_byte(len)?;
                self.write_bytes(comment)
            }
            Cmd::Post {
                prev,
                num,
                den,
                mag,
                max_height,
                max_width,
                max_stack,
                pages,
            } => {
                self.write_byte(POST)?;
                self.write_i32_be(*prev)?;
                self.write_u32_be(*num)?;
                self.write_u32_be(*den)?;
                self.write_u32_be(*mag)?;
                self.write_i32_be(*max_height)?;
                self.write_i32_be(*max_width)?;
                self.write_bytes(&max_stack.to_be_bytes())?;
                self.write_bytes(&pages.to_be_bytes())
            }
            Cmd::PostPost { post, id } => {
                self.write_byte(POST_POST)?;
                self.write_i32_be(*post)?;
                self.write_byte(*id)?;
                let filler = 4 + (4 - self.pos() % 4) % 4;
                for _ in 0..filler {
                    self.write_byte(TRAILER)?;
                }
                Ok(())
            }
        }
    }

    fn write_rule(&mut self, op: u8, height: i32, width: i32) -> Result<(), DviError> {
        self.write_byte(op)?;
        self.write_i32_be(height)?;
        self.write_i32_be(width)
    }

    /// Open a group and return the location to hand to
    /// [`write_bracket_pop`](Self::write_bracket_pop) when closing it.
    pub fn push(&mut self) -> Result<u64, DviError> {
        self.write_byte(PUSH)?;
        Ok(self.pos())
    }

    /// Start a page and return the position of its `bop`.
    ///
    /// The cursor cache is reset: a page starts at the origin with no font
    /// selected.
    pub fn begin_page(&mut self, counters: [i32; 10], prev: i32) -> Result<u64, DviError> {
        let loc = self.pos();
        self.write_cmd(&Cmd::Bop { counters, prev })?;
        self.set_h(0);
        self.set_v(0);
        self.set_current_font(None);
        Ok(loc)
    }

    /// Move right by `dx` and update the cached horizontal position.
    pub fn move_right(&mut self, dx: i32) -> Result<(), DviError> {
        self.write_variable_command(RIGHT1, dx)?;
        self.set_h(self.h().wrapping_add(dx));
        Ok(())
    }

    /// Move down by `dy` and update the cached vertical position.
    pub fn move_down(&mut self, dy: i32) -> Result<(), DviError> {
        self.write_variable_command(DOWN1, dy)?;
        self.set_v(self.v().wrapping_add(dy));
        Ok(())
    }

    /// Select `font` unless it is already the current one.
    pub fn select_font(&mut self, font: u32) -> Result<(), DviError> {
        if self.current_font() == Some(font) {
            return Ok(());
        }
        match u8::try_from(font) {
            Ok(f) if f < 64 => self.write_byte(FNT_NUM_0 + f)?,
            _ => self.write_unsigned_command(FNT1, font)?,
        }
        self.set_current_font(Some(font));
        Ok(())
    }

    /// Typeset character `code`, using `set_char_<code>` when possible.
    pub fn set_char(&mut self, code: u32) -> Result<(), DviError> {
        match u8::try_from(code) {
            Ok(c) if c < 128 => self.write_byte(c),
            _ => self.write_unsigned_command(SET1, code),
        }
    }

    fn write_unsigned_command(&mut self, base: u8, value: u32) -> Result<(), DviError> {
        let width = IntWidth::of_unsigned(value);
        self.write_sized_command(base, width, i32::from_be_bytes(value.to_be_bytes()))
    }

    /// Write the preamble with the standard TeX units (1/65536 pt per unit,
    /// `num = 25400000`, `den = 473628672`).
    pub fn write_preamble(&mut self, mag: u32, comment: &[u8]) -> Result<(), DviError> {
        self.write_cmd(&Cmd::Pre {
            id: DVI_ID,
            num: 25_400_000,
            den: 473_628_672,
            mag,
            comment: comment.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use bstr::BString;

    use super::*;
    use crate::opcode::FNT_DEF1;

    fn encode(cmds: &[Cmd]) -> Vec<u8> {
        let mut w = DviWriter::new(Vec::new());
        for cmd in cmds {
            w.write_cmd(cmd).unwrap();
        }
        w.finish().unwrap()
    }

    #[test]
    fn sized_commands_keep_their_width() {
        let bytes = encode(&[
            Cmd::Right {
                size: IntWidth::Four,
                amount: 1,
            },
            Cmd::Set {
                size: IntWidth::Two,
                code: 256,
            },
            Cmd::Fnt {
                size: IntWidth::One,
                font: 200,
            },
        ]);
        assert_eq!(
            bytes,
            [RIGHT1 + 3, 0, 0, 0, 1, SET1 + 1, 1, 0, FNT1, 200]
        );
    }

    #[test]
    fn bop_counts_pages() {
        let mut w = DviWriter::new(Vec::new());
        let loc = w.begin_page([3, 0, 0, 0, 0, 0, 0, 0, 0, 0], -1).unwrap();
        assert_eq!(loc, 0);
        assert_eq!(w.pos(), 45);
        assert_eq!(w.page_count(), 1);
        let bytes = w.finish().unwrap();
        assert_eq!(bytes[0], BOP);
        assert_eq!(&bytes[1..5], [0, 0, 0, 3]);
        assert_eq!(&bytes[41..45], [0xFF; 4]);
    }

    #[test]
    fn post_post_pads_to_four_bytes() {
        for lead in 0..4 {
            let mut cmds = vec![Cmd::Nop; lead];
            cmds.push(Cmd::PostPost { post: 7, id: DVI_ID });
            let bytes = encode(&cmds);
            assert_eq!(bytes.len() % 4, 0, "lead {lead}");
            let filler = bytes.len() - lead - 6;
            assert!((4..=7).contains(&filler), "lead {lead}: {filler}");
            assert!(bytes[lead + 6..].iter().all(|&b| b == TRAILER));
        }
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let mut w = DviWriter::new(Vec::new());
        assert!(w.write_cmd(&Cmd::SetChar(128)).is_err());
        assert!(w.write_cmd(&Cmd::FntNum(64)).is_err());
        let err = w
            .write_cmd(&Cmd::Xxx {
                size: IntWidth::One,
                payload: BString::from(vec![b' '; 256]),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            DviError::ProtocolViolation(ProtocolViolation::SpecialTooLong { len: 256, width: 1 })
        ));
        assert!(
            w.write_cmd(&Cmd::Pre {
                id: DVI_ID,
                num: 1,
                den: 1,
                mag: 1000,
                comment: BString::from(vec![b'c'; 300]),
            })
            .is_err()
        );
        assert_eq!(w.pos(), 0);
    }

    #[test]
    fn wide_font_definitions() {
        let bytes = encode(&[Cmd::FntDef {
            size: IntWidth::Two,
            font: 300,
            checksum: 1,
            scale: 2,
            design_size: 3,
            area: BString::from(""),
            name: BString::from("x"),
        }]);
        assert_eq!(bytes[..3], [FNT_DEF1 + 1, 0x01, 0x2C]);
        assert_eq!(bytes.len(), 1 + 2 + 12 + 2 + 1);
    }

    #[test]
    fn select_font_skips_current_font() {
        let mut w = DviWriter::new(Vec::new());
        w.select_font(3).unwrap();
        w.select_font(3).unwrap();
        w.select_font(64).unwrap();
        w.select_font(70_000).unwrap();
        assert_eq!(w.current_font(), Some(70_000));
        assert_eq!(
            w.finish().unwrap(),
            [FNT_NUM_0 + 3, FNT1, 64, FNT1 + 2, 0x01, 0x11, 0x70]
        );
    }

    #[test]
    fn moves_update_the_cursor_cache() {
        let mut w = DviWriter::new(Vec::new());
        w.move_right(200).unwrap();
        w.move_right(-50).unwrap();
        w.move_down(10).unwrap();
        assert_eq!((w.h(), w.v()), (150, 10));
        w.set_current_font(Some(1));
        w.begin_page([0; 10], -1).unwrap();
        assert_eq!((w.h(), w.v(), w.current_font()), (0, 0, None));
    }

    #[test]
    fn set_char_picks_short_form() {
        let mut w = DviWriter::new(Vec::new());
        w.set_char(65).unwrap();
        w.set_char(200).unwrap();
        w.set_char(0x1_0000).unwrap();
        assert_eq!(
            w.finish().unwrap(),
            [65, SET1, 200, SET1 + 2, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn push_location_allows_elision() {
        let mut w = DviWriter::new(Vec::new());
        let loc = w.push().unwrap();
        w.write_bracket_pop(loc).unwrap();
        let loc = w.push().unwrap();
        w.move_right(1).unwrap();
        w.write_bracket_pop(loc).unwrap();
        assert_eq!(w.finish().unwrap(), [PUSH, RIGHT1, 1, POP]);
    }

    #[test]
    fn preamble_layout() {
        let mut w = DviWriter::new(Vec::new());
        w.write_preamble(1000, b"hi").unwrap();
        let bytes = w.finish().unwrap();
        assert_eq!(bytes.len(), 15 + 2);
        assert_eq!(bytes[..2], [PRE, DVI_ID]);
        assert_eq!(bytes[14..], [2, b'h', b'i']);
    }

    #[test]
    fn eop_and_rules() {
        let bytes = encode(&[
            Cmd::PutRule {
                height: 1,
                width: -1,
            },
            Cmd::Eop,
        ]);
        assert_eq!(
            bytes,
            [PUT_RULE, 0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF, EOP]
        );
    }
}
