//! Purpose: Per-leaf transforms that move a file and return its new URL.
//! Exports: `Context`, `fetch_url`, `publish_url`.
//! Role: Glue between URL mapping rules and the storage backend.
//! Invariants: Both directions apply the same `strip_components` policy.
//! Invariants: Settings come from an explicit per-invocation `Context`.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::{Error, ErrorKind};
use super::location::{
    FILE_PREFIX, S3Location, escapes_root, join_key, parse_file_url, strip_components,
};
use crate::storage::Storage;

/// Settings shared by every transform in one invocation.
pub struct Context<'a> {
    storage: &'a dyn Storage,
    strip: usize,
    working_dir: PathBuf,
}

impl<'a> Context<'a> {
    /// Context rooted at the process working directory.
    pub fn new(storage: &'a dyn Storage, strip: usize) -> Result<Self, Error> {
        let working_dir = std::env::current_dir().map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to resolve current directory")
                .with_source(err)
        })?;
        Ok(Self::with_working_dir(storage, strip, working_dir))
    }

    pub fn with_working_dir(
        storage: &'a dyn Storage,
        strip: usize,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            storage,
            strip,
            working_dir: working_dir.into(),
        }
    }

    pub fn strip(&self) -> usize {
        self.strip
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

/// Downloads the object behind an `s3://` URL and returns the `file://` URL
/// of the local copy.
pub fn fetch_url(ctx: &Context<'_>, url: &str) -> Result<String, Error> {
    let source = S3Location::parse(url)?;
    if source.key.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("S3 URL \"{url}\" names no object key")));
    }

    let relative = strip_components(&source.key, ctx.strip);
    if escapes_root(&relative) {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!(
                "refusing to download \"{url}\" outside the working directory"
            ))
            .with_hint(
                "Object keys with `..` components or an empty component at the strip point cannot be staged locally.",
            ));
    }
    let dest = if relative.is_empty() {
        ctx.working_dir.clone()
    } else {
        ctx.working_dir.join(&relative)
    };
    if !dest.starts_with(&ctx.working_dir) {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!(
                "refusing to download \"{url}\" outside the working directory"
            ))
            .with_path(dest));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to create destination directory")
                .with_path(parent)
                .with_source(err)
        })?;
    }

    info!(url, dest = %dest.display(), "downloading");
    ctx.storage.download(&source.bucket, &source.key, &dest)?;
    Ok(format!("{FILE_PREFIX}{}", dest.display()))
}

/// Uploads the file behind a `file://` URL under `dest_base` and returns the
/// `s3://` URL of the new object.
pub fn publish_url(ctx: &Context<'_>, dest_base: &S3Location, url: &str) -> Result<String, Error> {
    let source = parse_file_url(url)?;
    let source_text = source.to_string_lossy();
    let relative = strip_components(source_text.trim_start_matches('/'), ctx.strip);
    let dest = S3Location {
        bucket: dest_base.bucket.clone(),
        key: join_key(&dest_base.key, &relative),
    };
    if dest.key.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("no object key left for \"{url}\" after stripping"))
            .with_hint("Lower --strip-components or add a key prefix to the destination."));
    }
    debug!(strip = ctx.strip, key = %dest.key, "composed destination key");

    info!(url, dest = %dest.url(), "uploading");
    ctx.storage.upload(&dest.bucket, &dest.key, &source)?;
    Ok(dest.url())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{Context, fetch_url, publish_url};
    use crate::core::error::{Error, ErrorKind};
    use crate::core::location::S3Location;
    use crate::storage::Storage;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Download {
            bucket: String,
            key: String,
            dest: PathBuf,
        },
        Upload {
            bucket: String,
            key: String,
            source: PathBuf,
        },
    }

    /// Records calls; fails the call numbered `fail_on` (1-based).
    #[derive(Default)]
    pub(crate) struct RecordingStorage {
        pub(crate) calls: RefCell<Vec<Call>>,
        pub(crate) fail_on: Option<usize>,
    }

    impl RecordingStorage {
        fn record(&self, call: Call) -> Result<(), Error> {
            let mut calls = self.calls.borrow_mut();
            calls.push(call);
            if self.fail_on == Some(calls.len()) {
                return Err(Error::new(ErrorKind::NotFound).with_message("injected failure"));
            }
            Ok(())
        }
    }

    impl Storage for RecordingStorage {
        fn download(&self, bucket: &str, key: &str, destination: &Path) -> Result<(), Error> {
            self.record(Call::Download {
                bucket: bucket.to_string(),
                key: key.to_string(),
                dest: destination.to_path_buf(),
            })
        }

        fn upload(&self, bucket: &str, key: &str, source: &Path) -> Result<(), Error> {
            self.record(Call::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source: source.to_path_buf(),
            })
        }
    }

    #[test]
    fn fetch_downloads_under_working_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let storage = RecordingStorage::default();
        let ctx = Context::with_working_dir(&storage, 0, temp.path());

        let url = fetch_url(&ctx, "s3://bucket1/dir/file.json").expect("fetch");

        let dest = temp.path().join("dir/file.json");
        assert_eq!(url, format!("file://{}", dest.display()));
        assert!(temp.path().join("dir").is_dir());
        assert_eq!(
            storage.calls.borrow().as_slice(),
            [Call::Download {
                bucket: "bucket1".to_string(),
                key: "dir/file.json".to_string(),
                dest,
            }]
        );
    }

    #[test]
    fn fetch_strips_leading_key_components() {
        let temp = tempfile::tempdir().expect("tempdir");
        let storage = RecordingStorage::default();
        let ctx = Context::with_working_dir(&storage, 2, temp.path());

        let url = fetch_url(&ctx, "s3://b/runs/42/out/result.bin").expect("fetch");
        assert_eq!(
            url,
            format!("file://{}", temp.path().join("out/result.bin").display())
        );
        match &storage.calls.borrow()[0] {
            Call::Download { key, .. } => assert_eq!(key, "runs/42/out/result.bin"),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn fetch_tolerates_existing_directories() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(temp.path().join("dir")).expect("mkdir");
        let storage = RecordingStorage::default();
        let ctx = Context::with_working_dir(&storage, 0, temp.path());
        fetch_url(&ctx, "s3://b/dir/a").expect("first");
        fetch_url(&ctx, "s3://b/dir/a").expect("repeat");
        assert_eq!(storage.calls.borrow().len(), 2);
    }

    #[test]
    fn fetch_rejects_parent_components_before_io() {
        let temp = tempfile::tempdir().expect("tempdir");
        let storage = RecordingStorage::default();
        let ctx = Context::with_working_dir(&storage, 0, temp.path());
        let err = fetch_url(&ctx, "s3://b/../escape").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(storage.calls.borrow().is_empty());
    }

    #[test]
    fn fetch_rejects_absolute_remainder_before_io() {
        let temp = tempfile::tempdir().expect("tempdir");
        let storage = RecordingStorage::default();
        let ctx = Context::with_working_dir(&storage, 1, temp.path());
        let err = fetch_url(&ctx, "s3://b/x//tmp/escaped_file").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(storage.calls.borrow().is_empty());
    }

    #[test]
    fn fetch_past_strip_boundary_targets_working_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let storage = RecordingStorage::default();
        let ctx = Context::with_working_dir(&storage, 5, temp.path());

        let url = fetch_url(&ctx, "s3://b/a/b").expect("fetch");

        assert_eq!(url, format!("file://{}", temp.path().display()));
        assert_eq!(
            storage.calls.borrow().as_slice(),
            [Call::Download {
                bucket: "b".to_string(),
                key: "a/b".to_string(),
                dest: temp.path().to_path_buf(),
            }]
        );
    }

    #[test]
    fn fetch_rejects_bucket_only_url() {
        let temp = tempfile::tempdir().expect("tempdir");
        let storage = RecordingStorage::default();
        let ctx = Context::with_working_dir(&storage, 0, temp.path());
        let err = fetch_url(&ctx, "s3://bucket-only").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn fetch_reports_unwritable_destination_as_io() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("blocker"), b"x").expect("write");
        let storage = RecordingStorage::default();
        let ctx = Context::with_working_dir(&storage, 0, temp.path());
        let err = fetch_url(&ctx, "s3://b/blocker/inner/file").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(storage.calls.borrow().is_empty());
    }

    #[test]
    fn publish_composes_key_under_base() {
        let storage = RecordingStorage::default();
        let ctx = Context::with_working_dir(&storage, 0, "/unused");
        let base = S3Location::parse("s3://bucket2/out").expect("base");

        let url = publish_url(&ctx, &base, "file:///cwd/dir/file.json").expect("publish");

        assert_eq!(url, "s3://bucket2/out/cwd/dir/file.json");
        assert_eq!(
            storage.calls.borrow().as_slice(),
            [Call::Upload {
                bucket: "bucket2".to_string(),
                key: "out/cwd/dir/file.json".to_string(),
                source: PathBuf::from("/cwd/dir/file.json"),
            }]
        );
    }

    #[test]
    fn publish_strip_drops_host_layout() {
        let storage = RecordingStorage::default();
        let ctx = Context::with_working_dir(&storage, 2, "/unused");
        let base = S3Location::parse("s3://bucket2/").expect("base");
        let url = publish_url(&ctx, &base, "file:///home/me/dir/a.txt").expect("publish");
        assert_eq!(url, "s3://bucket2/dir/a.txt");
    }

    #[test]
    fn publish_with_nothing_left_is_rejected() {
        let storage = RecordingStorage::default();
        let ctx = Context::with_working_dir(&storage, 5, "/unused");
        let base = S3Location::parse("s3://bucket2").expect("base");
        let err = publish_url(&ctx, &base, "file:///a/b").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(storage.calls.borrow().is_empty());
    }

    #[test]
    fn fetch_then_publish_keeps_key_layout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let storage = RecordingStorage::default();
        let ctx = Context::with_working_dir(&storage, 0, temp.path());
        let local = fetch_url(&ctx, "s3://bucket1/dir/file.json").expect("fetch");

        let base = S3Location::parse("s3://bucket2/out").expect("base");
        let remote = publish_url(&ctx, &base, &local).expect("publish");

        let cwd = temp.path().to_string_lossy();
        assert_eq!(
            remote,
            format!(
                "s3://bucket2/out/{}/dir/file.json",
                cwd.trim_start_matches('/')
            )
        );
    }
}
