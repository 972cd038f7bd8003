//! Purpose: Define the public Rust API boundary for tractorbeam.
//! Exports: Staging operations, transforms, the storage seam, and error types.
//! Role: Single import path for the CLI and integration tests.
//! Invariants: Additive-only; internal helpers stay in `core`.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::location::{
    FILE_PREFIX, S3_PREFIX, S3Location, join_key, parse_file_url, strip_components,
};
pub use crate::core::stage::{Operation, read_document, render_document, rewrite_document, stage};
pub use crate::core::transfer::{Context, fetch_url, publish_url};
pub use crate::core::visit::visit;
pub use crate::storage::{S3Storage, Storage};
