//! Decoding DVI byte streams into [`Cmd`] values.

use std::io::{self, BufReader, Read};

use bstr::BString;
use tracing::trace;

use crate::{
    Cmd, ReadError,
    opcode::{self, FNT_NUM_0, FNT_NUM_63, SET_CHAR_127},
    width::IntWidth,
};

/// Reads DVI commands one at a time.
///
/// Iteration yields each command together with the offset of its opcode. It
/// ends after `post_post`, or at a clean end of input between two commands.
/// The first error ends iteration as well.
///
/// # Examples
///
/// ```rust
/// use dvistream::{Cmd, DviReader, IntWidth};
///
/// let bytes = [141, 145, 0xFF, 0xFF, 0xFF, 142];
/// let cmds: Vec<_> = DviReader::new(&bytes[..])
///     .map(|res| res.map(|(_, cmd)| cmd))
///     .collect::<Result<_, _>>()?;
/// assert_eq!(
///     cmds,
///     [
///         Cmd::Push,
///         Cmd::Right { size: IntWidth::Three, amount: -1 },
///         Cmd::Pop,
///     ]
/// );
/// # Ok::<(), dvistream::ReadError>(())
/// ```
#[derive(Debug)]
pub struct DviReader<R> {
    r: BufReader<R>,
    offset: u64,
    opcode: u8,
    start: u64,
    done: bool,
}

impl<R: Read> DviReader<R> {
    pub fn new(r: R) -> Self {
        Self {
            r: BufReader::new(r),
            offset: 0,
            opcode: 0,
            start: 0,
            done: false,
        }
    }

    /// Read every remaining command.
    pub fn read_all(self) -> Result<Vec<(u64, Cmd)>, ReadError> {
        self.collect()
    }

    /// Offset of the next unread byte.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn next_cmd(&mut self) -> Result<Option<Cmd>, ReadError> {
        let mut op = [0u8; 1];
        loop {
            match self.r.read(&mut op) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.start = self.offset;
        self.offset += 1;
        self.opcode = op[0];
        let cmd = self.decode(op[0])?;
        trace!(offset = self.start, cmd = %cmd.name(), "decoded command");
        Ok(Some(cmd))
    }

    fn decode(&mut self, op: u8) -> Result<Cmd, ReadError> {
        use crate::opcode::{
            BOP, EOP, NOP, POP, POST, POST_POST, PRE, PUSH, PUT_RULE, SET_RULE, W0, X0, Y0, Z0,
        };

        let cmd = match op {
            0..=SET_CHAR_127 => Cmd::SetChar(op),
            SET_RULE => Cmd::SetRule {
                height: self.i32()?,
                width: self.i32()?,
            },
            PUT_RULE => Cmd::PutRule {
                height: self.i32()?,
                width: self.i32()?,
            },
            NOP => Cmd::Nop,
            BOP => {
                let mut counters = [0; 10];
                for c in &mut counters {
                    *c = self.i32()?;
                }
                Cmd::Bop {
                    counters,
                    prev: self.i32()?,
                }
            }
            EOP => Cmd::Eop,
            PUSH => Cmd::Push,
            POP => Cmd::Pop,
            W0 => Cmd::W0,
            X0 => Cmd::X0,
            Y0 => Cmd::Y0,
            Z0 => Cmd::Z0,
            FNT_NUM_0..=FNT_NUM_63 => Cmd::FntNum(op - FNT_NUM_0),
            PRE => {
                let id = self.u8()?;
                let num = self.u32()?;
                let den = self.u32()?;
                let mag = self.u32()?;
                let len = self.u8()?;
                Cmd::Pre {
                    id,
                    num,
                    den,
                    mag,
                    comment: self.bytes(u64::from(len))?,
                }
            }
            POST => Cmd::Post {
                prev: self.i32()?,
                num: self.u32()?,
                den: self.u32()?,
                mag: self.u32()?,
                max_height: self.i32()?,
                max_width: self.i32()?,
                max_stack: self.u16()?,
                pages: self.u16()?,
            },
            POST_POST => {
                let post = self.i32()?;
                let id = self.u8()?;
                self.done = true;
                Cmd::PostPost { post, id }
            }
            _ => return self.decode_family(op),
        };
        Ok(cmd)
    }

    fn decode_family(&mut self, op: u8) -> Result<Cmd, ReadError> {
        use crate::opcode::{DOWN1, FNT_DEF1, FNT1, PUT1, RIGHT1, SET1, W1, X1, XXX1, Y1, Z1};

        let Some((_, base)) = opcode::family(op) else {
            return Err(ReadError::UndefinedOpcode {
                opcode: op,
                offset: self.start,
            });
        };
        let Some(size) = IntWidth::from_opcode_offset(op - base) else {
            unreachable!("opcode families span four widths");
        };

        let cmd = match base {
            SET1 => Cmd::Set {
                size,
                code: self.param(size, false)?,
            },
            PUT1 => Cmd::Put {
                size,
                code: self.param(size, false)?,
            },
            RIGHT1 => Cmd::Right {
                size,
                amount: self.param(size, true)?,
            },
            W1 => Cmd::W {
                size,
                amount: self.param(size, true)?,
            },
            X1 => Cmd::X {
                size,
                amount: self.param(size, true)?,
            },
            DOWN1 => Cmd::Down {
                size,
                amount: self.param(size, true)?,
            },
            Y1 => Cmd::Y {
                size,
                amount: self.param(size, true)?,
            },
            Z1 => Cmd::Z {
                size,
                amount: self.param(size, true)?,
            },
            FNT1 => Cmd::Fnt {
                size,
                font: self.param(size, false)?,
            },
            XXX1 => {
                let len = self.param(size, false)?;
                // A negative four-byte length cannot be satisfied by any stream.
                let len = u64::try_from(len).map_err(|_| self.eof())?;
                Cmd::Xxx {
                    size,
                    payload: self.bytes(len)?,
                }
            }
            FNT_DEF1 => {
                let font = self.param(size, false)?;
                let checksum = self.u32()?;
                let scale = self.i32()?;
                let design_size = self.i32()?;
                let area_len = self.u8()?;
                let name_len = self.u8()?;
                Cmd::FntDef {
                    size,
                    font,
                    checksum,
                    scale,
                    design_size,
                    area: self.bytes(u64::from(area_len))?,
                    name: self.bytes(u64::from(name_len))?,
                }
            }
            _ => unreachable!("no opcode family starts at {base}"),
        };
        Ok(cmd)
    }

    fn eof(&self) -> ReadError {
        ReadError::UnexpectedEof {
            opcode: self.opcode,
            offset: self.start,
        }
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<(), ReadError> {
        match self.r.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(self.eof()),
            Err(e) => Err(e.into()),
        }
    }

    fn u8(&mut self) -> Result<u8, ReadError> {
        let mut b = [0; 1];
        self.fill(&mut b)?;
        Ok(b[0])
    }

    fn u16(&mut self) -> Result<u16, ReadError> {
        let mut b = [0; 2];
        self.fill(&mut b)?;
        Ok(u16::from_be_bytes(b))
    }

    fn u32(&mut self) -> Result<u32, ReadError> {
        let mut b = [0; 4];
        self.fill(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }

    fn i32(&mut self) -> Result<i32, ReadError> {
        let mut b = [0; 4];
        self.fill(&mut b)?;
        Ok(i32::from_be_bytes(b))
    }

    /// Read a `size`-byte big-endian parameter, sign-extending when `signed`.
    /// Four-byte parameters are always signed.
    fn param(&mut self, size: IntWidth, signed: bool) -> Result<i32, ReadError> {
        let n = size.byte_len();
        let mut b = [0; 4];
        self.fill(&mut b[4 - n..])?;
        if signed && b[4 - n] & 0x80 != 0 {
            b[..4 - n].fill(0xFF);
        }
        Ok(i32::from_be_bytes(b))
    }

    fn bytes(&mut self, len: u64) -> Result<BString, ReadError> {
        let mut buf = Vec::new();
        // `take` bounds the allocation by what the stream actually holds.
        let got = self.r.by_ref().take(len).read_to_end(&mut buf)?;
        self.offset += got as u64;
        if (got as u64) < len {
            return Err(self.eof());
        }
        Ok(BString::from(buf))
    }
}

impl<R: Read> Iterator for DviReader<R> {
    type Item = Result<(u64, Cmd), ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_cmd() {
            Ok(Some(cmd)) => Some(Ok((self.start, cmd))),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(bytes: &[u8]) -> Result<Vec<Cmd>, ReadError> {
        DviReader::new(bytes)
            .map(|res| res.map(|(_, cmd)| cmd))
            .collect()
    }

    #[test]
    fn sign_extends_movements_only() {
        let cmds = read(&[
            143, 0xFF, // right1 -1
            144, 0xFF, 0x7F, // right2 -129
            128, 0xFF, // set1 255
            130, 0xFF, 0xFF, 0xFF, // set3 16777215
            157 + 3, 0x80, 0, 0, 0, // down4 i32::MIN
            235 + 3, 0xFF, 0xFF, 0xFF, 0xFF, // fnt4 -1
        ])
        .unwrap();
        assert_eq!(
            cmds,
            [
                Cmd::Right {
                    size: IntWidth::One,
                    amount: -1
                },
                Cmd::Right {
                    size: IntWidth::Two,
                    amount: -129
                },
                Cmd::Set {
                    size: IntWidth::One,
                    code: 255
                },
                Cmd::Set {
                    size: IntWidth::Three,
                    code: 0x00FF_FFFF
                },
                Cmd::Down {
                    size: IntWidth::Four,
                    amount: i32::MIN
                },
                Cmd::Fnt {
                    size: IntWidth::Four,
                    font: -1
                },
            ]
        );
    }

    #[test]
    fn offsets_point_at_opcodes() {
        let offsets: Vec<u64> = DviReader::new(&[141, 143, 1, 147, 142][..])
            .map(|res| res.unwrap().0)
            .collect();
        assert_eq!(offsets, [0, 1, 3, 4]);
    }

    #[test]
    fn stops_after_post_post() {
        let mut bytes = vec![249, 0, 0, 0, 42, 2];
        bytes.extend([223; 6]);
        let mut reader = DviReader::new(&bytes[..]);
        assert_eq!(
            reader.next().unwrap().unwrap(),
            (0, Cmd::PostPost { post: 42, id: 2 })
        );
        assert!(reader.next().is_none());
    }

    #[test]
    fn undefined_opcode() {
        let err = read(&[138, 250]).unwrap_err();
        assert!(matches!(
            err,
            ReadError::UndefinedOpcode {
                opcode: 250,
                offset: 1
            }
        ));
    }

    #[test]
    fn truncated_command() {
        let err = read(&[138, 139, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            ReadError::UnexpectedEof {
                opcode: 139,
                offset: 1
            }
        ));

        // special claims more bytes than the stream holds
        let err = read(&[239, 10, b'a']).unwrap_err();
        assert!(matches!(err, ReadError::UnexpectedEof { opcode: 239, .. }));

        let err = read(&[242, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, ReadError::UnexpectedEof { opcode: 242, .. }));
    }

    #[test]
    fn font_definition_and_special() {
        let mut bytes = vec![243, 5];
        bytes.extend([0, 0, 0, 1]);
        bytes.extend([0, 0x0A, 0, 0]);
        bytes.extend([0, 0x0A, 0, 0]);
        bytes.extend([0, 5]);
        bytes.extend(b"cmr10");
        bytes.extend([239, 3]);
        bytes.extend(b"abc");
        let cmds = read(&bytes).unwrap();
        assert_eq!(
            cmds,
            [
                Cmd::FntDef {
                    size: IntWidth::One,
                    font: 5,
                    checksum: 1,
                    scale: 0x000A_0000,
                    design_size: 0x000A_0000,
                    area: BString::from(""),
                    name: BString::from("cmr10"),
                },
                Cmd::Xxx {
                    size: IntWidth::One,
                    payload: BString::from("abc"),
                },
            ]
        );
    }
}
