use quickcheck::QuickCheck;

use super::arbitrary::{BufferSize, GroupOp};
use crate::{
    DviWriter, WriterOptions,
    opcode::{POP, PUSH},
};

/// Run `ops` against `w`, closing whatever is left open at the end.
fn run<W: std::io::Write>(w: &mut DviWriter<W>, ops: &[GroupOp]) {
    let mut open = Vec::new();
    for op in ops {
        match *op {
            GroupOp::Open => {
                w.write_byte(PUSH).unwrap();
                open.push(w.pos());
            }
            GroupOp::Close => {
                if let Some(loc) = open.pop() {
                    w.write_bracket_pop(loc).unwrap();
                }
            }
            GroupOp::Content(b) => w.write_byte(b).unwrap(),
        }
    }
    while let Some(loc) = open.pop() {
        w.write_bracket_pop(loc).unwrap();
    }
}

/// Output of `ops` when every empty group is elided.
fn model(ops: &[GroupOp]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut open = Vec::new();
    let close = |out: &mut Vec<u8>, loc: usize| {
        if loc == out.len() {
            out.pop();
        } else {
            out.push(POP);
        }
    };
    for op in ops {
        match *op {
            GroupOp::Open => {
                out.push(PUSH);
                open.push(out.len());
            }
            GroupOp::Close => {
                if let Some(loc) = open.pop() {
                    close(&mut out, loc);
                }
            }
            GroupOp::Content(b) => out.push(b),
        }
    }
    while let Some(loc) = open.pop() {
        close(&mut out, loc);
    }
    out
}

/// Pushes and pops pair up and never go below depth zero.
fn balanced(bytes: &[u8]) -> bool {
    let mut depth = 0usize;
    for &b in bytes {
        match b {
            PUSH => depth += 1,
            POP => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

/// Property: with a buffer larger than the output, every empty group
/// disappears.
#[test]
fn empty_groups_are_elided_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(ops: Vec<GroupOp>) -> bool {
        let mut w = DviWriter::new(Vec::new());
        run(&mut w, &ops);
        let end = w.pos();
        let bytes = w.finish().unwrap();
        bytes.len() as u64 == end && bytes == model(&ops)
    }

    QuickCheck::new()
        .tests(if is_ci::cached() { 10_000 } else { 1_000 })
        .quickcheck(prop as fn(Vec<GroupOp>) -> bool);
}

/// Property: with a tiny buffer some `push` bytes leave before their group is
/// closed, but pushes and pops in the output still pair up.
#[test]
fn groups_stay_balanced_across_swaps_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(ops: Vec<GroupOp>, size: BufferSize) -> bool {
        let mut w = DviWriter::with_options(
            Vec::new(),
            WriterOptions {
                buffer_size: size.0,
            },
        )
        .unwrap();
        run(&mut w, &ops);
        let end = w.pos();
        let bytes = w.finish().unwrap();
        bytes.len() as u64 == end && balanced(&bytes)
    }

    QuickCheck::new()
        .tests(if is_ci::cached() { 10_000 } else { 1_000 })
        .quickcheck(prop as fn(Vec<GroupOp>, BufferSize) -> bool);
}
