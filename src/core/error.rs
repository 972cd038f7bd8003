use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Same code clap uses for argument errors.
const EXIT_USAGE: i32 = 2;
/// sysexits `EX_SOFTWARE`.
const EXIT_SOFTWARE: i32 = 70;
/// sysexits `EX_CONFIG`.
const EXIT_CONFIG: i32 = 78;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    NotConfigured,
    NotFound,
    Permission,
    Transfer,
    Io,
}

impl ErrorKind {
    /// Fatal kinds that are written to the error log instead of stderr at
    /// quiet log levels.
    pub fn is_loggable(self) -> bool {
        !matches!(self, ErrorKind::Usage | ErrorKind::NotConfigured)
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    path: Option<PathBuf>,
    object: Option<(String, String)>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            path: None,
            object: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Bucket and key of the object involved, if any.
    pub fn object(&self) -> Option<(&str, &str)> {
        self.object
            .as_ref()
            .map(|(bucket, key)| (bucket.as_str(), key.as_str()))
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_object(mut self, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        self.object = Some((bucket.into(), key.into()));
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Messages of the whole `source()` chain, outermost first.
    pub fn causes(&self) -> Vec<String> {
        let mut causes = Vec::new();
        let mut cur = self.source();
        while let Some(source) = cur {
            causes.push(source.to_string());
            cur = source.source();
        }
        causes
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        if let Some((bucket, key)) = &self.object {
            write!(f, " (object: s3://{bucket}/{key})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Usage => EXIT_USAGE,
        ErrorKind::NotConfigured => EXIT_CONFIG,
        ErrorKind::Internal
        | ErrorKind::NotFound
        | ErrorKind::Permission
        | ErrorKind::Transfer
        | ErrorKind::Io => EXIT_SOFTWARE,
    }
}
