//! Dump stream format
//!
//! - [`property`]: the `K`/`V`/`D` property block codec
//! - [`record`]: stream, revision and node record writer
//! - [`headers`]: header field names

pub mod headers;
mod property;
mod record;

pub use property::{
    encode_property, encode_property_set, encoded_len, encoded_set_len, PROPS_END, PROPS_END_LEN,
};
pub use record::{DumpWriter, NodeBody, NodeHeader, PathRules, TextBody};
