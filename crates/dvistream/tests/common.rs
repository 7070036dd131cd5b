#![allow(missing_docs)]

use dvistream::{Cmd, DviWriter, IntWidth};

pub const CHECKSUM: u32 = 0x1234_5678;
pub const TEN_PT: i32 = 655_360;

/// A one-page document with a preamble, a font, a group, a special, a rule
/// and a postamble, laid out the way TeX writes it.
pub fn sample_document() -> Vec<u8> {
    let mut w = DviWriter::new(Vec::new());
    w.write_preamble(1000, b"sample").unwrap();

    let bop = w.begin_page([1, 0, 0, 0, 0, 0, 0, 0, 0, 0], -1).unwrap();
    w.write_font_definition(0, CHECKSUM, TEN_PT, TEN_PT, b"", b"cmr10")
        .unwrap();
    w.select_font(0).unwrap();
    w.move_down(TEN_PT).unwrap();

    let group = w.push().unwrap();
    w.move_right(-200).unwrap();
    w.set_char(u32::from(b'H')).unwrap();
    w.set_char(u32::from(b'i')).unwrap();
    w.write_bracket_pop(group).unwrap();

    // nothing happens inside this group, so neither byte reaches the output
    let empty = w.push().unwrap();
    w.write_bracket_pop(empty).unwrap();

    w.write_cmd(&Cmd::Xxx {
        size: IntWidth::One,
        payload: "color pop".into(),
    })
    .unwrap();
    w.write_cmd(&Cmd::SetRule {
        height: 26_214,
        width: 65_536,
    })
    .unwrap();
    w.write_cmd(&Cmd::Eop).unwrap();

    let post = w.pos();
    w.write_cmd(&Cmd::Post {
        prev: i32::try_from(bop).unwrap(),
        num: 25_400_000,
        den: 473_628_672,
        mag: 1000,
        max_height: TEN_PT,
        max_width: 65_536,
        max_stack: 1,
        pages: u16::try_from(w.page_count()).unwrap(),
    })
    .unwrap();
    w.write_font_definition(0, CHECKSUM, TEN_PT, TEN_PT, b"", b"cmr10")
        .unwrap();
    w.write_cmd(&Cmd::PostPost {
        post: i32::try_from(post).unwrap(),
        id: 2,
    })
    .unwrap();

    w.finish().unwrap()
}
