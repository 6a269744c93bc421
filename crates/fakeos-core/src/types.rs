//! Core type definitions shared by every driver

use std::fmt;
use std::time::SystemTime;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::Errno;

pub const PATH_SEPARATOR: char = '/';
pub const PATH_LIST_SEPARATOR: char = ':';
pub const DEV_NULL: &str = "/dev/null";

/// Type and permission bits of a filesystem entity
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileMode(u32);

impl FileMode {
    pub const DIR: FileMode = FileMode(1 << 31);
    pub const SYMLINK: FileMode = FileMode(1 << 27);
    pub const PERM: FileMode = FileMode(0o777);
    const TYPE_MASK: u32 = Self::DIR.0 | Self::SYMLINK.0;

    pub const fn new(bits: u32) -> Self {
        FileMode(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn perm(self) -> u32 {
        self.0 & Self::PERM.0
    }

    pub const fn is_dir(self) -> bool {
        self.0 & Self::DIR.0 != 0
    }

    pub const fn is_symlink(self) -> bool {
        self.0 & Self::SYMLINK.0 != 0
    }

    pub const fn is_regular(self) -> bool {
        self.0 & Self::TYPE_MASK == 0
    }

    /// Replace the permission bits, keeping the type bits.
    pub const fn with_perm(self, perm: u32) -> Self {
        FileMode((self.0 & !Self::PERM.0) | (perm & Self::PERM.0))
    }

    pub(crate) const fn for_kind(kind: FileKind, perm: u32) -> Self {
        let type_bits = match kind {
            FileKind::Regular => 0,
            FileKind::Directory => Self::DIR.0,
            FileKind::Symlink => Self::SYMLINK.0,
        };
        FileMode(type_bits | (perm & Self::PERM.0))
    }
}

impl From<u32> for FileMode {
    fn from(bits: u32) -> Self {
        FileMode(bits)
    }
}

impl fmt::Debug for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileMode({self})")
    }
}

/// Renders like `ls -l`: `drwxr-xr-x`, `Lrwxrwxrwx`, `-rw-r--r--`.
impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_dir() {
            'd'
        } else if self.is_symlink() {
            'L'
        } else {
            '-'
        };
        let mut out = String::with_capacity(10);
        out.push(kind);
        for shift in [6u32, 3, 0] {
            let bits = (self.0 >> shift) & 0o7;
            out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        f.write_str(&out)
    }
}

/// Filesystem entity kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
}

/// Metadata snapshot returned by `stat`, `lstat` and `File::stat`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    /// Base name of the path the snapshot was taken through
    pub name: String,
    pub size: u64,
    pub mode: FileMode,
    pub modified: SystemTime,
    pub accessed: SystemTime,
    pub changed: SystemTime,
    pub uid: u32,
    pub gid: u32,
    /// Device and inode pair identifying the underlying entity
    pub dev: u64,
    pub ino: u64,
}

impl FileInfo {
    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    pub fn is_symlink(&self) -> bool {
        self.mode.is_symlink()
    }

    pub fn kind(&self) -> FileKind {
        if self.mode.is_dir() {
            FileKind::Directory
        } else if self.mode.is_symlink() {
            FileKind::Symlink
        } else {
            FileKind::Regular
        }
    }
}

bitflags! {
    /// Open-mode flags, using the Linux bit values.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const RDONLY = 0;
        const WRONLY = 0o1;
        const RDWR = 0o2;
        const CREATE = 0o100;
        const EXCL = 0o200;
        const TRUNC = 0o1000;
        const APPEND = 0o2000;
        const SYNC = 0o4010000;
    }
}

/// Access mode encoded in the two low bits of [`OpenFlags`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl OpenFlags {
    pub fn access_mode(self) -> AccessMode {
        match self.bits() & 0o3 {
            0 => AccessMode::ReadOnly,
            1 => AccessMode::WriteOnly,
            _ => AccessMode::ReadWrite,
        }
    }
}

/// Seek origin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl TryFrom<i32> for Whence {
    type Error = Errno;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            _ => Err(Errno::InvalidArgument),
        }
    }
}
