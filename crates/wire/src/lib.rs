//! Dump stream encoding for revdump
//!
//! This crate implements the textual dump format that a compatible loader
//! replays to rebuild a repository. It provides:
//!
//! - a property codec whose length computation agrees byte for byte with
//!   its encoder
//! - a record writer for the stream header, revision headers and node
//!   records, with exact `*-length` header fields
//!
//! ## Stream Layout
//!
//! ```text
//! SVN-fs-dump-format-version: 2
//!
//! UUID: <uuid>
//!
//! Revision-number: 1
//! Prop-content-length: 31
//! Content-length: 31
//!
//! K 7
//! svn:log
//! V 4
//! init
//! PROPS-END
//!
//! Node-path: a.txt
//! Node-kind: file
//! Node-action: add
//! Text-content-length: 6
//! Content-length: 6
//!
//! hello
//! ```
//!
//! ## Examples
//!
//! ```
//! use revdump_wire::{encode_property, encoded_len};
//!
//! let mut buf = Vec::new();
//! encode_property(&mut buf, "svn:log", Some(b"init")).unwrap();
//! assert_eq!(buf.len() as u64, encoded_len("svn:log", Some(b"init")));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dump;

// Re-export main types
pub use dump::{
    encode_property, encode_property_set, encoded_len, encoded_set_len, headers, DumpWriter,
    NodeBody, NodeHeader, PathRules, TextBody, PROPS_END, PROPS_END_LEN,
};
