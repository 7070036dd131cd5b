//! A tracing interpreter for decoded DVI commands.
//!
//! [`Interpreter`] runs commands in stream order and keeps the DVI machine
//! state: the `(h, v, w, x, y, z)` registers, the `push`/`pop` stack, the
//! fonts defined so far and the selected font. Each command is reported on
//! one line (two for `push` and `pop`, which also print the register level)
//! in the style of `dvitype`:
//!
//! ```text
//! down3 655360 v:=0+655360=+655360, vv:=42
//! push
//! level 0:(h=0,v=655360,w=0,x=0,y=0,z=0,hh=0,vv=42)
//! fntnum0 current font is cmr10
//! ```
//!
//! Positions are converted to device pixels with the units of the `pre`
//! command and the configured resolution. No font metrics are loaded: the
//! width a character advances `h` by comes from a [`CharWidth`] function,
//! which by default uses the character code itself.

use std::{collections::BTreeMap, io::Write};

use bstr::BString;
use tracing::debug;

use crate::{Cmd, error::InterpretError};

/// Resolution used for pixel conversion unless configured otherwise.
pub const DEFAULT_RESOLUTION: f64 = 300.0;

/// Width in DVI units that typesetting `code` in `font` moves `h` by.
pub type CharWidth = fn(font: Option<&FontDef>, code: i32) -> i32;

/// Stand-in width used when no metrics are available.
#[must_use]
pub fn code_as_width(_font: Option<&FontDef>, code: i32) -> i32 {
    code
}

/// The six DVI position registers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub h: i32,
    pub v: i32,
    pub w: i32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// A font as announced by `fnt_def`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontDef {
    pub font: i32,
    pub checksum: u32,
    pub scale: i32,
    pub design_size: i32,
    pub area: BString,
    pub name: BString,
}

/// Runs DVI commands and writes a trace of the machine state to `out`.
///
/// # Examples
///
/// ```rust
/// use dvistream::{Cmd, Interpreter};
///
/// let mut interp = Interpreter::new(Vec::new());
/// interp.run(&Cmd::Push)?;
/// interp.run(&Cmd::W0)?;
/// interp.run(&Cmd::Pop)?;
/// assert_eq!(interp.depth(), 0);
/// # Ok::<(), dvistream::InterpretError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<W> {
    out: W,
    /// Never empty: the last entry is the current level.
    stack: Vec<Registers>,
    fonts: BTreeMap<i32, FontDef>,
    font: Option<i32>,
    page: u32,
    resolution: f64,
    conv: f64,
    char_width: CharWidth,
}

#[derive(Clone, Copy)]
enum Axis {
    H,
    V,
}

impl<W: Write> Interpreter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            stack: vec![Registers::default()],
            fonts: BTreeMap::new(),
            font: None,
            page: 0,
            resolution: DEFAULT_RESOLUTION,
            conv: 0.0,
            char_width: code_as_width,
        }
    }

    /// Convert to pixels at `dpi` dots per inch.
    #[must_use]
    pub fn with_resolution(mut self, dpi: f64) -> Self {
        self.resolution = dpi;
        self
    }

    #[must_use]
    pub fn with_char_width(mut self, char_width: CharWidth) -> Self {
        self.char_width = char_width;
        self
    }

    /// Registers of the current level.
    #[must_use]
    pub fn registers(&self) -> Registers {
        self.cur()
    }

    /// Number of levels pushed and not yet popped.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Number of `bop` commands seen.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn font(&self, font: i32) -> Option<&FontDef> {
        self.fonts.get(&font)
    }

    #[must_use]
    pub fn current_font(&self) -> Option<&FontDef> {
        self.font.and_then(|f| self.fonts.get(&f))
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn cur(&self) -> Registers {
        self.stack.last().copied().unwrap_or_default()
    }

    fn cur_mut(&mut self) -> &mut Registers {
        if self.stack.is_empty() {
            self.stack.push(Registers::default());
        }
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    #[allow(clippy::cast_possible_truncation)]
    fn pixels(&self, v: i32) -> i32 {
        (self.conv * f64::from(v)).round() as i32
    }

    /// Run one command.
    pub fn run(&mut self, cmd: &Cmd) -> Result<(), InterpretError> {
        let name = cmd.name().replace('_', "");
        match cmd {
            Cmd::Pre {
                num,
                den,
                mag,
                comment,
                ..
            } => {
                writeln!(self.out, "numerator/denominator={num}/{den}")?;
                self.conv = f64::from(*num) / 254_000.0 * (self.resolution / f64::from(*den))
                    * f64::from(*mag)
                    / 1000.0;
                writeln!(
                    self.out,
                    "magnification={mag};       {:10.8} pixels per DVI unit",
                    self.conv
                )?;
                writeln!(self.out, "'{comment}'")?;
            }
            Cmd::Bop { .. } => {
                self.page += 1;
                self.stack.clear();
                self.stack.push(Registers::default());
                self.font = None;
                debug!(page = self.page, "page");
                writeln!(self.out, "beginning of page {}", self.page)?;
            }
            Cmd::Eop => {
                if self.depth() != 0 {
                    debug!(depth = self.depth(), "page ends inside a group");
                }
                writeln!(self.out, "{name}")?;
            }
            Cmd::Nop => writeln!(self.out, "{name}")?,
            Cmd::Push => {
                writeln!(self.out, "{name}")?;
                let level = self.depth();
                self.stack.push(self.cur());
                self.write_level(level)?;
            }
            Cmd::Pop => {
                if self.depth() == 0 {
                    return Err(InterpretError::UnbalancedPop);
                }
                writeln!(self.out, "{name}")?;
                self.stack.pop();
                self.write_level(self.depth())?;
            }
            Cmd::SetChar(c) => {
                let code = i32::from(*c);
                write!(self.out, "{name}")?;
                self.advance_char(code)?;
            }
            Cmd::Set { code, .. } => {
                write!(self.out, "{name} {code}")?;
                self.advance_char(*code)?;
            }
            Cmd::Put { code, .. } => writeln!(self.out, "{name} {code}")?,
            Cmd::SetRule { height, width } => {
                write!(self.out, "{name} height {height}, width {width}")?;
                let old = self.cur().h;
                let new = old.wrapping_add(*width);
                self.cur_mut().h = new;
                writeln!(self.out, " h:={old}{width:+}={new}, hh:={}", self.pixels(new))?;
            }
            Cmd::PutRule { height, width } => {
                writeln!(self.out, "{name} height {height}, width {width}")?;
            }
            Cmd::Right { amount, .. } => self.moved(&name, Some(*amount), *amount, Axis::H)?,
            Cmd::W0 => self.moved(&name, None, self.cur().w, Axis::H)?,
            Cmd::W { amount, .. } => {
                self.cur_mut().w = *amount;
                self.moved(&name, Some(*amount), *amount, Axis::H)?;
            }
            Cmd::X0 => self.moved(&name, None, self.cur().x, Axis::H)?,
            Cmd::X { amount, .. } => {
                self.cur_mut().x = *amount;
                self.moved(&name, Some(*amount), *amount, Axis::H)?;
            }
            Cmd::Down { amount, .. } => self.moved(&name, Some(*amount), *amount, Axis::V)?,
            Cmd::Y0 => self.moved(&name, None, self.cur().y, Axis::V)?,
            Cmd::Y { amount, .. } => {
                self.cur_mut().y = *amount;
                self.moved(&name, Some(*amount), *amount, Axis::V)?;
            }
            Cmd::Z0 => self.moved(&name, None, self.cur().z, Axis::V)?,
            Cmd::Z { amount, .. } => {
                self.cur_mut().z = *amount;
                self.moved(&name, Some(*amount), *amount, Axis::V)?;
            }
            Cmd::FntNum(f) => {
                let font = i32::from(*f);
                let def = self.select(font)?;
                writeln!(self.out, "{name} current font is {def}")?;
            }
            Cmd::Fnt { font, .. } => {
                let def = self.select(*font)?;
                writeln!(self.out, "{name} {font} current font is {def}")?;
            }
            Cmd::Xxx { payload, .. } => writeln!(self.out, "{name} '{payload}'")?,
            Cmd::FntDef {
                font,
                checksum,
                scale,
                design_size,
                area,
                name: font_name,
                ..
            } => {
                writeln!(self.out, "{name} {font}: {font_name}")?;
                self.fonts.insert(
                    *font,
                    FontDef {
                        font: *font,
                        checksum: *checksum,
                        scale: *scale,
                        design_size: *design_size,
                        area: area.clone(),
                        name: font_name.clone(),
                    },
                );
            }
            Cmd::Post {
                max_height,
                max_width,
                max_stack,
                pages,
                ..
            } => writeln!(
                self.out,
                "{name} pages={pages} maxv={max_height} maxh={max_width} maxstackdepth={max_stack}"
            )?,
            Cmd::PostPost { post, .. } => writeln!(self.out, "{name} pointer={post}")?,
        }
        Ok(())
    }

    fn select(&mut self, font: i32) -> Result<BString, InterpretError> {
        let def = self
            .fonts
            .get(&font)
            .ok_or(InterpretError::UndefinedFont { font })?;
        let name = def.name.clone();
        self.font = Some(font);
        Ok(name)
    }

    /// Move `h` by the width of `code` and finish the current line.
    fn advance_char(&mut self, code: i32) -> Result<(), InterpretError> {
        let width = (self.char_width)(self.current_font(), code);
        let old = self.cur().h;
        let new = old.wrapping_add(width);
        self.cur_mut().h = new;
        writeln!(self.out, " h:={old}{width:+}={new}, hh:={}", self.pixels(new))?;
        Ok(())
    }

    fn moved(
        &mut self,
        name: &str,
        shown: Option<i32>,
        delta: i32,
        axis: Axis,
    ) -> Result<(), InterpretError> {
        write!(self.out, "{name}")?;
        if let Some(amount) = shown {
            write!(self.out, " {amount}")?;
        }
        let regs = self.cur_mut();
        let (reg, pixel) = match axis {
            Axis::H => (&mut regs.h, "hh"),
            Axis::V => (&mut regs.v, "vv"),
        };
        let old = *reg;
        *reg = old.wrapping_add(delta);
        let new = *reg;
        let reg_name = &pixel[..1];
        writeln!(
            self.out,
            " {reg_name}:={old}{delta:+}={new:+}, {pixel}:={}",
            self.pixels(new)
        )?;
        Ok(())
    }

    fn write_level(&mut self, level: usize) -> Result<(), InterpretError> {
        let Registers { h, v, w, x, y, z } = self.cur();
        let (hh, vv) = (self.pixels(h), self.pixels(v));
        writeln!(
            self.out,
            "level {level}:(h={h},v={v},w={w},x={x},y={y},z={z},hh={hh},vv={vv})"
        )?;
        Ok(())
    }
}
