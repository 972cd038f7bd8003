//! Purpose: Append fatal error reports to the per-user error log.
//! Exports: `append_error_report`, `error_report`.
//! Role: Persistence for diagnostics the CLI only summarizes on stderr.
//! Invariants: Append-only; each entry is an RFC 3339 timestamp line plus the report.
//! Invariants: Failures are returned to the caller, which falls back to stderr.
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use tractorbeam::api::Error;

/// Full plain-text diagnostic: headline, context, and every cause.
pub(crate) fn error_report(err: &Error) -> String {
    let mut lines = vec![err.to_string()];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    for cause in err.causes() {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}

pub(crate) fn append_error_report(path: &Path, err: &Error) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(io::Error::other)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{timestamp}")?;
    writeln!(file, "{}", error_report(err))?;
    file.flush()
}
