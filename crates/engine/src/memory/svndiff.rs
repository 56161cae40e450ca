//! svndiff0 full-text encoding
//!
//! Content is emitted as a delta against the empty source: every window has
//! an empty source view and a single new-data instruction.

/// Stream header of svndiff version 0
pub const SVNDIFF0_HEADER: &[u8] = b"SVN\0";

/// Maximum target bytes per window
pub const WINDOW_SIZE: usize = 100 * 1024;

const OP_NEW_DATA: u8 = 0x80;

/// Append `value` as a big-endian base-128 integer
fn write_varint(out: &mut Vec<u8>, value: u64) {
    let mut groups = vec![(value & 0x7f) as u8];
    let mut rest = value >> 7;
    while rest > 0 {
        groups.push(((rest & 0x7f) as u8) | 0x80);
        rest >>= 7;
    }
    out.extend(groups.iter().rev());
}

fn encode_window(out: &mut Vec<u8>, chunk: &[u8]) {
    let mut instructions = Vec::with_capacity(4);
    if chunk.len() < 64 {
        instructions.push(OP_NEW_DATA | chunk.len() as u8);
    } else {
        instructions.push(OP_NEW_DATA);
        write_varint(&mut instructions, chunk.len() as u64);
    }

    write_varint(out, 0); // source view offset
    write_varint(out, 0); // source view length
    write_varint(out, chunk.len() as u64);
    write_varint(out, instructions.len() as u64);
    write_varint(out, chunk.len() as u64);
    out.extend_from_slice(&instructions);
    out.extend_from_slice(chunk);
}

/// Encode `data` as an svndiff0 delta against the empty text
pub fn encode_fulltext(data: &[u8]) -> Vec<u8> {
    let mut out = SVNDIFF0_HEADER.to_vec();
    for chunk in data.chunks(WINDOW_SIZE) {
        encode_window(&mut out, chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(&mut out, value);
        out
    }

    #[test]
    fn test_varint() {
        assert_eq!(varint(0), vec![0x00]);
        assert_eq!(varint(127), vec![0x7f]);
        assert_eq!(varint(128), vec![0x81, 0x00]);
        assert_eq!(varint(130), vec![0x81, 0x02]);
        assert_eq!(varint(102_400), vec![0x86, 0xa0, 0x00]);
    }

    #[test]
    fn test_empty_text_is_header_only() {
        assert_eq!(encode_fulltext(b""), b"SVN\0".to_vec());
    }

    #[test]
    fn test_short_window() {
        let out = encode_fulltext(b"hello\n");
        assert_eq!(
            out,
            [&b"SVN\0"[..], &[0, 0, 6, 1, 6, 0x86], &b"hello\n"[..]].concat()
        );
    }

    #[test]
    fn test_long_window_uses_separate_length() {
        let data = vec![b'x'; 200];
        let out = encode_fulltext(&data);
        // header, offset, length, target len (2), insn len, data len (2), op, varint (2)
        assert_eq!(&out[4..13], &[0, 0, 0x81, 0x48, 3, 0x81, 0x48, 0x80, 0x81][..]);
        assert_eq!(out[13], 0x48);
        assert_eq!(out.len(), 4 + 10 + 200);
    }

    #[test]
    fn test_large_text_split_into_windows() {
        let data = vec![7u8; WINDOW_SIZE + 10];
        let out = encode_fulltext(&data);
        let first = 1 + 1 + 3 + 1 + 3 + 4;
        let second = 1 + 1 + 1 + 1 + 1 + 1;
        assert_eq!(out.len(), 4 + first + second + data.len());
    }
}
