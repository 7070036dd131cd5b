#![no_main]

use arbitrary::Arbitrary;
use dvistream::{DviWriter, WriterOptions};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Byte(u8),
    Push,
    Pop,
    Move(i32),
    Font(u32),
    Char(u32),
}

#[derive(Debug, Arbitrary)]
struct Input {
    half: u8,
    ops: Vec<Op>,
}

/// Drive the writer with random operations through a small buffer. Positions
/// must stay consistent with what reaches the sink.
fn writer(input: Input) {
    let buffer_size = 8 + 2 * usize::from(input.half);
    let mut w = DviWriter::with_options(Vec::new(), WriterOptions { buffer_size }).unwrap();
    let mut open = Vec::new();
    for op in input.ops {
        match op {
            Op::Byte(b) => w.write_byte(b).unwrap(),
            Op::Push => open.push(w.push().unwrap()),
            Op::Pop => {
                if let Some(loc) = open.pop() {
                    w.write_bracket_pop(loc).unwrap();
                }
            }
            Op::Move(dx) => w.move_right(dx).unwrap(),
            Op::Font(f) => w.select_font(f).unwrap(),
            Op::Char(c) => w.set_char(c).unwrap(),
        }
        assert!(w.pos() >= w.bytes_flushed());
        assert!(w.pos() - w.bytes_flushed() <= buffer_size as u64);
    }
    let end = w.pos();
    let bytes = w.finish().unwrap();
    assert_eq!(bytes.len() as u64, end);
}

fuzz_target!(|input: Input| writer(input));
