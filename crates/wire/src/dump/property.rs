//! Property block encoding
//!
//! Each property is written as
//!
//! ```text
//! K <key length>
//! <key>
//! V <value length>
//! <value>
//! ```
//!
//! and a deleted property as `D <key length>\n<key>\n`. A block of
//! properties ends with a single `PROPS-END\n` marker.
//!
//! [`encoded_len`] and [`encode_property`] share the marker formatting so
//! the computed length always matches what is written. The format has no
//! resynchronization: one wrong length corrupts every record after it.

use revdump_core::PropertySet;
use std::io::{self, Write};

/// End-of-properties marker
pub const PROPS_END: &[u8] = b"PROPS-END\n";

/// Length of [`PROPS_END`]
pub const PROPS_END_LEN: u64 = PROPS_END.len() as u64;

/// Format a length marker line such as `K 7\n`
fn marker(tag: char, len: usize) -> String {
    format!("{} {}\n", tag, len)
}

/// Encoded length of one property, terminator excluded
pub fn encoded_len(key: &str, value: Option<&[u8]>) -> u64 {
    let key_part = key.len() + 1;
    let len = match value {
        Some(v) => marker('K', key.len()).len() + key_part + marker('V', v.len()).len() + v.len() + 1,
        None => marker('D', key.len()).len() + key_part,
    };
    len as u64
}

/// Write one property, terminator excluded
pub fn encode_property<W: Write + ?Sized>(
    out: &mut W,
    key: &str,
    value: Option<&[u8]>,
) -> io::Result<()> {
    let tag = if value.is_some() { 'K' } else { 'D' };
    out.write_all(marker(tag, key.len()).as_bytes())?;
    out.write_all(key.as_bytes())?;
    out.write_all(b"\n")?;
    if let Some(v) = value {
        out.write_all(marker('V', v.len()).as_bytes())?;
        out.write_all(v)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Encoded length of a whole property set including the terminator
///
/// An empty set has length 0: no block is written for it.
pub fn encoded_set_len(props: &PropertySet) -> u64 {
    if props.is_empty() {
        return 0;
    }
    props.iter().map(|(k, v)| encoded_len(k, v)).sum::<u64>() + PROPS_END_LEN
}

/// Write a whole property set followed by the terminator
///
/// Writes nothing for an empty set.
pub fn encode_property_set<W: Write + ?Sized>(out: &mut W, props: &PropertySet) -> io::Result<()> {
    if props.is_empty() {
        return Ok(());
    }
    for (key, value) in props.iter() {
        encode_property(out, key, value)?;
    }
    out.write_all(PROPS_END)
}
