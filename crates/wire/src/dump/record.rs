//! Dump record writer
//!
//! [`DumpWriter`] emits the stream header, revision headers and node
//! records. Every length field is computed from the same byte representation
//! that is then written, and property blocks and text bodies are counted as
//! they go out: a disagreement is reported as [`DumpError::LengthMismatch`].

use super::headers;
use super::property::{encode_property, encode_property_set, encoded_len, encoded_set_len, PROPS_END, PROPS_END_LEN};
use revdump_core::{DumpError, DumpResult, NodeAction, NodeKind, PropertySet, RevisionMetadata, Revnum};
use std::borrow::Cow;
use std::io::{self, Read, Write};

/// Rules turning a node's stored path into the path written to the stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathRules {
    /// Prepended verbatim, no separator logic
    pub user_prefix: Option<String>,
    /// Constant path used when the export root is a single file
    pub single_file: Option<String>,
}

impl PathRules {
    /// Path as written on the `Node-path` line
    pub fn output_path<'a>(&'a self, path: &'a str) -> Cow<'a, str> {
        let path = self.single_file.as_deref().unwrap_or(path);
        match &self.user_prefix {
            Some(prefix) => Cow::Owned(format!("{}{}", prefix, path)),
            None => Cow::Borrowed(path),
        }
    }
}

/// Identity of a node record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeader<'a> {
    /// Stored (repository-relative) path
    pub path: &'a str,
    /// Node kind, not written for deletions
    pub kind: NodeKind,
    /// Node action
    pub action: NodeAction,
}

/// Text content of a file record
pub struct TextBody<'a> {
    /// Source of the already-encoded content
    pub reader: &'a mut dyn Read,
    /// Exact number of bytes `reader` yields
    pub len: u64,
    /// Content is a delta rather than a full text
    pub delta: bool,
}

/// Optional bodies of a node record
#[derive(Default)]
pub struct NodeBody<'a> {
    /// Changed properties
    pub props: Option<&'a PropertySet>,
    /// Changed content
    pub text: Option<TextBody<'a>>,
}

impl<'a> NodeBody<'a> {
    /// Record without any body
    pub fn empty() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.props.map_or(true, |p| p.is_empty()) && self.text.is_none()
    }
}

/// Byte-counting adapter around the output
struct Counting<W> {
    inner: W,
    count: u64,
}

impl<W: Write> Write for Counting<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Writer for dump streams
pub struct DumpWriter<W: Write> {
    out: Counting<W>,
    paths: PathRules,
}

impl<W: Write> DumpWriter<W> {
    /// Create a writer with default path rules
    pub fn new(out: W) -> Self {
        Self::with_paths(out, PathRules::default())
    }

    /// Create a writer with the given path rules
    pub fn with_paths(out: W, paths: PathRules) -> Self {
        DumpWriter {
            out: Counting { inner: out, count: 0 },
            paths,
        }
    }

    /// Total bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.out.count
    }

    /// Flush the underlying output
    pub fn flush(&mut self) -> DumpResult<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Unwrap the underlying output
    pub fn into_inner(self) -> W {
        self.out.inner
    }

    fn header(&mut self, name: &str, value: impl std::fmt::Display) -> io::Result<()> {
        writeln!(self.out, "{}: {}", name, value)
    }

    /// Write the format version line and the optional UUID line
    pub fn write_stream_header(&mut self, version: u32, uuid: Option<&str>) -> DumpResult<()> {
        self.header(headers::MAGIC_HEADER, version)?;
        self.out.write_all(b"\n")?;
        if let Some(uuid) = uuid {
            self.header(headers::UUID, uuid)?;
            self.out.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Write a revision record
    ///
    /// The property block holds log, author and date in that order; absent
    /// slots are skipped and a revision without any gets no block at all.
    pub fn write_revision_header(&mut self, meta: &RevisionMetadata, number: Revnum) -> DumpResult<()> {
        let present: Vec<(&str, &str)> = meta
            .properties()
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect();

        let mut props_len: u64 = present
            .iter()
            .map(|(k, v)| encoded_len(k, Some(v.as_bytes())))
            .sum();
        if props_len > 0 {
            props_len += PROPS_END_LEN;
        }

        self.header(headers::REVISION_NUMBER, number)?;
        self.header(headers::PROP_CONTENT_LENGTH, props_len)?;
        self.header(headers::CONTENT_LENGTH, props_len)?;
        self.out.write_all(b"\n")?;

        if props_len > 0 {
            let before = self.out.count;
            for (key, value) in &present {
                encode_property(&mut self.out, key, Some(value.as_bytes()))?;
            }
            self.out.write_all(PROPS_END)?;
            self.check_written(props_len, before)?;
            self.out.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Write a node record
    ///
    /// Deletions carry no kind line and no body. Properties of a `change`
    /// record are written as a delta (`Prop-delta: true`) so that a loader
    /// keeps the keys not mentioned. Other records announce
    /// `Prop-content-length`, `Text-content-length` and `Content-length`
    /// for whichever bodies are present.
    pub fn write_node(&mut self, node: &NodeHeader<'_>, body: NodeBody<'_>) -> DumpResult<()> {
        let path = self.paths.output_path(node.path).into_owned();
        self.header(headers::NODE_PATH, path)?;

        if node.action == NodeAction::Delete {
            if !body.is_empty() {
                return Err(DumpError::contract(format!(
                    "delete record for '{}' with a body",
                    node.path
                )));
            }
            self.header(headers::NODE_ACTION, node.action)?;
            self.out.write_all(b"\n\n")?;
            return Ok(());
        }

        self.header(headers::NODE_KIND, node.kind)?;
        self.header(headers::NODE_ACTION, node.action)?;

        if body.is_empty() {
            self.out.write_all(b"\n\n")?;
            return Ok(());
        }

        let props = body.props.filter(|p| !p.is_empty());
        let props_len = props.map(encoded_set_len);

        // A change record carries only the changed keys
        if props.map_or(false, |p| node.action == NodeAction::Change || p.has_deletions()) {
            self.header(headers::PROP_DELTA, "true")?;
        }
        if body.text.as_ref().map_or(false, |t| t.delta) {
            self.header(headers::TEXT_DELTA, "true")?;
        }
        if let Some(len) = props_len {
            self.header(headers::PROP_CONTENT_LENGTH, len)?;
        }
        if let Some(text) = &body.text {
            self.header(headers::TEXT_CONTENT_LENGTH, text.len)?;
        }
        let total = props_len.unwrap_or(0) + body.text.as_ref().map_or(0, |t| t.len);
        self.header(headers::CONTENT_LENGTH, total)?;
        self.out.write_all(b"\n")?;

        if let (Some(props), Some(len)) = (props, props_len) {
            let before = self.out.count;
            encode_property_set(&mut self.out, props)?;
            self.check_written(len, before)?;
        }
        if let Some(text) = body.text {
            let copied = io::copy(text.reader, &mut self.out)?;
            if copied != text.len {
                return Err(DumpError::LengthMismatch {
                    declared: text.len,
                    written: copied,
                });
            }
        }
        self.out.write_all(b"\n\n")?;
        Ok(())
    }

    fn check_written(&self, declared: u64, before: u64) -> DumpResult<()> {
        let written = self.out.count - before;
        if written != declared {
            return Err(DumpError::LengthMismatch { declared, written });
        }
        Ok(())
    }
}
