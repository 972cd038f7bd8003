//! Purpose: Map `s3://` and `file://` references to buckets, keys, and local paths.
//! Exports: `S3Location`, `parse_file_url`, `strip_components`, `join_key`, URL prefixes.
//! Role: Pure string/path rules shared by the fetch and publish transforms.
//! Invariants: One strip policy for both directions: split on `/`, drop N, rejoin.
//! Invariants: Keys and paths are taken literally; no percent-decoding.
use std::path::PathBuf;

use super::error::{Error, ErrorKind};

pub const S3_PREFIX: &str = "s3://";
pub const FILE_PREFIX: &str = "file://";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct S3Location {
    pub bucket: String,
    /// Object key or key prefix, without a leading slash. May be empty.
    pub key: String,
}

impl S3Location {
    pub fn parse(url: &str) -> Result<Self, Error> {
        let Some(rest) = url.strip_prefix(S3_PREFIX) else {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("expected \"{url}\" to start with \"{S3_PREFIX}\"")));
        };
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("S3 URL \"{url}\" names no bucket")));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            key: key.trim_start_matches('/').to_string(),
        })
    }

    pub fn url(&self) -> String {
        format!("{S3_PREFIX}{}/{}", self.bucket, self.key)
    }
}

/// Local path named by a `file://` URL. An authority, if present, is ignored.
pub fn parse_file_url(url: &str) -> Result<PathBuf, Error> {
    let Some(rest) = url.strip_prefix(FILE_PREFIX) else {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("expected \"{url}\" to start with \"{FILE_PREFIX}\"")));
    };
    let path = match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "",
    };
    if path.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("file URL \"{url}\" names no local path")));
    }
    Ok(PathBuf::from(path))
}

/// Drops the first `strip` `/`-separated components of `path`.
///
/// Stripping more components than `path` has yields the empty string.
pub fn strip_components(path: &str, strip: usize) -> String {
    path.split('/').skip(strip).collect::<Vec<_>>().join("/")
}

/// Joins a key prefix and a relative key with a single `/`.
pub fn join_key(prefix: &str, rest: &str) -> String {
    let prefix = prefix.trim_matches('/');
    match (prefix.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{rest}"),
    }
}

/// Whether a relative path would leave the directory it is joined to, either
/// by a `..` component or by being absolute after stripping.
pub(crate) fn escapes_root(relative: &str) -> bool {
    relative.starts_with('/') || relative.split('/').any(|component| component == "..")
}
