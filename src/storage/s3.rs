//! AWS SDK S3 implementation of `Storage`.

use std::cell::OnceCell;
use std::error::Error as StdError;
use std::fmt::Debug;
use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::provider::error::CredentialsError;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use tokio::io::AsyncWriteExt;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use super::Storage;
use crate::core::error::{Error, ErrorKind};

const NOT_CONFIGURED_MESSAGE: &str = "The AWS CLI is not configured.";
const NOT_CONFIGURED_HINT: &str = "Please configure it using instructions at \
     http://docs.aws.amazon.com/cli/latest/userguide/cli-chap-getting-started.html";

/// Blocking S3 client.
///
/// Owns a current-thread runtime and drives each SDK call to completion
/// before returning. The SDK client is built on first use, so commands that
/// find nothing to transfer never touch AWS configuration.
pub struct S3Storage {
    runtime: Runtime,
    client: OnceCell<S3Client>,
}

impl S3Storage {
    pub fn new() -> Result<Self, Error> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to start async runtime")
                    .with_source(err)
            })?;
        Ok(Self {
            runtime,
            client: OnceCell::new(),
        })
    }

    fn client(&self) -> Result<&S3Client, Error> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let config = self
            .runtime
            .block_on(aws_config::defaults(BehaviorVersion::latest()).load());
        let Some(region) = config.region() else {
            return Err(not_configured());
        };
        debug!(region = %region, "loaded AWS configuration");
        Ok(self.client.get_or_init(|| S3Client::new(&config)))
    }
}

impl Storage for S3Storage {
    fn download(&self, bucket: &str, key: &str, destination: &Path) -> Result<(), Error> {
        let client = self.client()?;
        self.runtime.block_on(async {
            let response = client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|err| sdk_error(err, "download", bucket, key))?;

            let mut file = tokio::fs::File::create(destination)
                .await
                .map_err(|err| local_error("failed to create destination file", destination, err))?;

            let mut body = response.body;
            while let Some(chunk) = body.try_next().await.map_err(|err| {
                Error::new(ErrorKind::Transfer)
                    .with_message("download interrupted")
                    .with_object(bucket, key)
                    .with_source(err)
            })? {
                file.write_all(&chunk)
                    .await
                    .map_err(|err| local_error("failed to write destination file", destination, err))?;
            }

            file.flush()
                .await
                .map_err(|err| local_error("failed to write destination file", destination, err))
        })
    }

    fn upload(&self, bucket: &str, key: &str, source: &Path) -> Result<(), Error> {
        // Open the source first so a missing file fails before any AWS I/O.
        let body = self
            .runtime
            .block_on(ByteStream::from_path(source))
            .map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read source file")
                    .with_path(source)
                    .with_source(err)
            })?;
        let client = self.client()?;
        self.runtime
            .block_on(
                client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .body(body)
                    .send(),
            )
            .map_err(|err| sdk_error(err, "upload", bucket, key))?;
        Ok(())
    }
}

fn not_configured() -> Error {
    Error::new(ErrorKind::NotConfigured)
        .with_message(NOT_CONFIGURED_MESSAGE)
        .with_hint(NOT_CONFIGURED_HINT)
}

fn local_error(message: &str, path: &Path, err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message(message)
        .with_path(path)
        .with_source(err)
}

fn sdk_error<E, R>(err: SdkError<E, R>, action: &str, bucket: &str, key: &str) -> Error
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    if is_credentials_error(&err) {
        return not_configured().with_source(err);
    }
    let kind = match err.as_service_error().and_then(|service| service.code()) {
        Some("NoSuchKey" | "NoSuchBucket" | "NotFound") => ErrorKind::NotFound,
        Some(
            "AccessDenied" | "Forbidden" | "AllAccessDisabled" | "InvalidAccessKeyId"
            | "SignatureDoesNotMatch",
        ) => ErrorKind::Permission,
        _ => ErrorKind::Transfer,
    };
    Error::new(kind)
        .with_message(format!("{action} failed"))
        .with_object(bucket, key)
        .with_source(err)
}

fn is_credentials_error(err: &(dyn StdError + 'static)) -> bool {
    let mut cur = Some(err);
    while let Some(source) = cur {
        if source.downcast_ref::<CredentialsError>().is_some() {
            return true;
        }
        cur = source.source();
    }
    false
}
