//! Header field names of the dump format
//!
//! These names are read by existing loaders and must not change.

/// First line of every stream
pub const MAGIC_HEADER: &str = "SVN-fs-dump-format-version";
/// Repository UUID
pub const UUID: &str = "UUID";
/// Revision number of a revision record
pub const REVISION_NUMBER: &str = "Revision-number";
/// Path of a node record
pub const NODE_PATH: &str = "Node-path";
/// Kind of a node record
pub const NODE_KIND: &str = "Node-kind";
/// Action of a node record
pub const NODE_ACTION: &str = "Node-action";
/// Property block is a delta against the previous property set
pub const PROP_DELTA: &str = "Prop-delta";
/// Text body is a delta
pub const TEXT_DELTA: &str = "Text-delta";
/// Length of the property block
pub const PROP_CONTENT_LENGTH: &str = "Prop-content-length";
/// Length of the text body
pub const TEXT_CONTENT_LENGTH: &str = "Text-content-length";
/// Total body length
pub const CONTENT_LENGTH: &str = "Content-length";
