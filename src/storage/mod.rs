//! Purpose: Define the object-storage capability the transforms depend on.
//! Exports: `Storage`, `S3Storage`.
//! Role: Seam between the tree rewriter and the network; tests substitute fakes.
//! Invariants: Calls are blocking and happen one at a time in the caller's order.
//! Invariants: Failures come back as `Error` with the bucket/key attached.
use std::path::Path;

use crate::core::error::Error;

mod s3;

pub use s3::S3Storage;

pub trait Storage {
    /// Writes object `(bucket, key)` to `destination`, replacing any existing file.
    fn download(&self, bucket: &str, key: &str, destination: &Path) -> Result<(), Error>;

    /// Creates or replaces object `(bucket, key)` with the contents of `source`.
    fn upload(&self, bucket: &str, key: &str, source: &Path) -> Result<(), Error>;
}
