//! Error types for the fakeos driver boundary.
//!
//! Failures are classified into a small POSIX-like cause taxonomy
//! ([`Errno`]) and wrapped with the operation and path(s) that produced
//! them ([`OsError`]). Callers assert on the cause only, so the same
//! assertions hold no matter which driver executed the operation.

use std::io;

/// Cause code carried by every [`OsError`]
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Errno {
    #[error("no such file or directory")]
    NotFound,
    #[error("file already exists")]
    AlreadyExists,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("permission denied")]
    PermissionDenied,
    #[error("file already closed")]
    InvalidHandle,
    #[error("operation not supported")]
    Unsupported,
}

impl From<io::ErrorKind> for Errno {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => Errno::NotFound,
            io::ErrorKind::AlreadyExists => Errno::AlreadyExists,
            io::ErrorKind::PermissionDenied => Errno::PermissionDenied,
            io::ErrorKind::Unsupported => Errno::Unsupported,
            _ => Errno::InvalidArgument,
        }
    }
}

impl From<&io::Error> for Errno {
    fn from(err: &io::Error) -> Self {
        err.kind().into()
    }
}

impl From<Errno> for io::ErrorKind {
    fn from(errno: Errno) -> Self {
        match errno {
            Errno::NotFound => io::ErrorKind::NotFound,
            Errno::AlreadyExists => io::ErrorKind::AlreadyExists,
            Errno::InvalidArgument => io::ErrorKind::InvalidInput,
            Errno::PermissionDenied => io::ErrorKind::PermissionDenied,
            Errno::InvalidHandle => io::ErrorKind::Other,
            Errno::Unsupported => io::ErrorKind::Unsupported,
        }
    }
}

/// Structured error returned at the driver and file boundary
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OsError {
    /// Single-path failure
    #[error("{op} {path}: {cause}")]
    Path {
        op: &'static str,
        path: String,
        cause: Errno,
    },
    /// Two-path failure (link, rename, symlink)
    #[error("{op} {old} {new}: {cause}")]
    Link {
        op: &'static str,
        old: String,
        new: String,
        cause: Errno,
    },
    /// Failure of an operation that takes no path
    #[error("{op}: {cause}")]
    Syscall { op: &'static str, cause: Errno },
}

impl OsError {
    pub fn path(op: &'static str, path: impl Into<String>, cause: Errno) -> Self {
        OsError::Path {
            op,
            path: path.into(),
            cause,
        }
    }

    pub fn link(
        op: &'static str,
        old: impl Into<String>,
        new: impl Into<String>,
        cause: Errno,
    ) -> Self {
        OsError::Link {
            op,
            old: old.into(),
            new: new.into(),
            cause,
        }
    }

    pub fn syscall(op: &'static str, cause: Errno) -> Self {
        OsError::Syscall { op, cause }
    }

    /// Wrap a host I/O error, classifying its kind.
    pub fn from_io(op: &'static str, path: impl Into<String>, err: &io::Error) -> Self {
        OsError::path(op, path, Errno::from(err))
    }

    pub fn cause(&self) -> Errno {
        match self {
            OsError::Path { cause, .. }
            | OsError::Link { cause, .. }
            | OsError::Syscall { cause, .. } => *cause,
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            OsError::Path { op, .. } | OsError::Link { op, .. } | OsError::Syscall { op, .. } => op,
        }
    }

    pub fn is_exist(&self) -> bool {
        self.cause() == Errno::AlreadyExists
    }

    pub fn is_not_exist(&self) -> bool {
        self.cause() == Errno::NotFound
    }

    pub fn is_permission(&self) -> bool {
        self.cause() == Errno::PermissionDenied
    }
}

impl From<OsError> for io::Error {
    fn from(err: OsError) -> Self {
        io::Error::new(err.cause().into(), err)
    }
}

pub type Result<T> = std::result::Result<T, OsError>;
