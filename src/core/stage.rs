//! Purpose: Stage one JSON document: parse, rewrite every matching URL, render.
//! Exports: `Operation`, `read_document`, `rewrite_document`, `render_document`, `stage`.
//! Role: Document-level entrypoint used by the CLI commands and library callers.
//! Invariants: Output is written only after the whole tree rewrote successfully.
//! Invariants: Rendering is pretty JSON with two-space indentation plus a newline.
use std::io::{Read, Write};

use serde_json::Value;
use tracing::debug;

use super::error::{Error, ErrorKind};
use super::location::{FILE_PREFIX, S3_PREFIX, S3Location};
use super::transfer::{Context, fetch_url, publish_url};
use super::visit::visit;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operation {
    /// Download `s3://` references and point them at local files.
    Fetch,
    /// Upload `file://` references under the given base.
    Publish { dest_base: S3Location },
}

impl Operation {
    pub fn prefix(&self) -> &'static str {
        match self {
            Operation::Fetch => S3_PREFIX,
            Operation::Publish { .. } => FILE_PREFIX,
        }
    }
}

pub fn read_document<R: Read>(reader: R) -> Result<Value, Error> {
    serde_json::from_reader(reader).map_err(|err| {
        let kind = if err.is_io() {
            ErrorKind::Io
        } else {
            ErrorKind::Usage
        };
        Error::new(kind)
            .with_message("invalid json on stdin")
            .with_hint("Provide a single JSON document on standard input.")
            .with_source(err)
    })
}

pub fn rewrite_document(
    ctx: &Context<'_>,
    operation: &Operation,
    document: &mut Value,
) -> Result<(), Error> {
    debug!(
        prefix = operation.prefix(),
        strip = ctx.strip(),
        working_dir = %ctx.working_dir().display(),
        "rewriting document"
    );
    match operation {
        Operation::Fetch => visit(document, S3_PREFIX, &mut |url: &str| fetch_url(ctx, url)),
        Operation::Publish { dest_base } => visit(document, FILE_PREFIX, &mut |url: &str| {
            publish_url(ctx, dest_base, url)
        }),
    }
}

pub fn render_document(document: &Value) -> Result<String, Error> {
    let mut text = serde_json::to_string_pretty(document).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("json encode failed")
            .with_source(err)
    })?;
    text.push('\n');
    Ok(text)
}

/// Reads a document from `input`, rewrites it, and writes it to `output`.
///
/// Nothing reaches `output` unless every transfer succeeded.
pub fn stage<R: Read, W: Write>(
    ctx: &Context<'_>,
    operation: &Operation,
    input: R,
    mut output: W,
) -> Result<(), Error> {
    let mut document = read_document(input)?;
    rewrite_document(ctx, operation, &mut document)?;
    let text = render_document(&document)?;
    output
        .write_all(text.as_bytes())
        .and_then(|()| output.flush())
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write output")
                .with_source(err)
        })
}
