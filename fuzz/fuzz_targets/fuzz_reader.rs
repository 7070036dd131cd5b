#![no_main]

use dvistream::{DviReader, DviWriter};
use libfuzzer_sys::fuzz_target;

/// Decode arbitrary bytes. The commands that decode cleanly must encode back
/// to the bytes they were read from.
fn reader(data: &[u8]) {
    let mut reader = DviReader::new(data);
    let mut cmds = Vec::new();
    let mut end = 0;
    while let Some(Ok((offset, cmd))) = reader.next() {
        cmds.push((offset, cmd));
        end = reader.offset();
    }
    let end = usize::try_from(end).unwrap();

    let mut w = DviWriter::new(Vec::new());
    for (offset, cmd) in &cmds {
        assert_eq!(w.pos(), *offset, "{cmd:?}");
        w.write_cmd(cmd).unwrap();
    }
    let bytes = w.finish().unwrap();
    // post_post adds its trailer, which the reader never consumes
    assert!(bytes.len() >= end);
    assert_eq!(bytes[..end], data[..end]);
}

fuzz_target!(|data: &[u8]| reader(data));
