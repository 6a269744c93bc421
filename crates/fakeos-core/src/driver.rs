//! Capability interfaces consumed by caller code.
//!
//! Code that needs the filesystem, the environment or the process identity
//! takes a `&dyn Driver` (or `Arc<dyn Driver>`) instead of calling the
//! operating system directly, so tests can hand it a [`crate::MemDriver`].

use std::fmt;
use std::time::SystemTime;

use crate::error::{OsError, Result};
use crate::types::{FileInfo, FileMode, OpenFlags, Whence, PATH_SEPARATOR};

/// Path, identity and environment operations of one operating system
pub trait Driver: Send + Sync + fmt::Debug {
    fn chdir(&self, dir: &str) -> Result<()>;
    fn chmod(&self, name: &str, mode: FileMode) -> Result<()>;
    fn chown(&self, name: &str, uid: u32, gid: u32) -> Result<()>;
    fn chtimes(&self, name: &str, atime: SystemTime, mtime: SystemTime) -> Result<()>;
    fn lchown(&self, name: &str, uid: u32, gid: u32) -> Result<()>;

    fn clearenv(&self);
    /// `key=value` strings in no particular order
    fn environ(&self) -> Vec<String>;
    /// Value of `key`, empty when unset
    fn getenv(&self, key: &str) -> String;
    fn setenv(&self, key: &str, value: &str) -> Result<()>;
    fn expand(&self, s: &str, mapping: &dyn Fn(&str) -> String) -> String;
    fn expand_env(&self, s: &str) -> String;

    fn getegid(&self) -> u32;
    fn geteuid(&self) -> u32;
    fn getgid(&self) -> u32;
    fn getuid(&self) -> u32;
    fn getgroups(&self) -> Result<Vec<u32>>;
    fn getpagesize(&self) -> usize;
    fn getpid(&self) -> u32;
    fn getppid(&self) -> u32;
    fn getwd(&self) -> Result<String>;
    fn hostname(&self) -> Result<String>;
    fn exit(&self, code: i32);

    fn is_exist(&self, err: &OsError) -> bool {
        err.is_exist()
    }

    fn is_not_exist(&self, err: &OsError) -> bool {
        err.is_not_exist()
    }

    fn is_permission(&self, err: &OsError) -> bool {
        err.is_permission()
    }

    fn is_path_separator(&self, c: u8) -> bool {
        c == PATH_SEPARATOR as u8
    }

    fn link(&self, old: &str, new: &str) -> Result<()>;
    fn mkdir(&self, name: &str, perm: FileMode) -> Result<()>;
    fn mkdir_all(&self, path: &str, perm: FileMode) -> Result<()>;
    fn readlink(&self, name: &str) -> Result<String>;
    fn remove(&self, name: &str) -> Result<()>;
    fn remove_all(&self, path: &str) -> Result<()>;
    fn rename(&self, old: &str, new: &str) -> Result<()>;
    fn same_file(&self, a: &FileInfo, b: &FileInfo) -> bool {
        a.dev == b.dev && a.ino == b.ino
    }
    fn symlink(&self, old: &str, new: &str) -> Result<()>;
    fn temp_dir(&self) -> String;
    fn truncate(&self, name: &str, size: u64) -> Result<()>;

    fn create(&self, name: &str) -> Result<Box<dyn File>>;
    fn new_file(&self, fd: u64, name: &str) -> Box<dyn File>;
    fn open(&self, name: &str) -> Result<Box<dyn File>>;
    fn open_file(&self, name: &str, flags: OpenFlags, perm: FileMode) -> Result<Box<dyn File>>;
    fn pipe(&self) -> Result<(Box<dyn File>, Box<dyn File>)>;

    fn lstat(&self, name: &str) -> Result<FileInfo>;
    fn stat(&self, name: &str) -> Result<FileInfo>;
}

/// An open file. Not internally synchronized: one owner at a time.
pub trait File: Send + fmt::Debug {
    fn chdir(&self) -> Result<()>;
    fn chmod(&self, mode: FileMode) -> Result<()>;
    fn chown(&self, uid: u32, gid: u32) -> Result<()>;
    fn close(&mut self) -> Result<()>;
    fn fd(&self) -> u64;
    fn name(&self) -> &str;
    /// Returns 0 at end of file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    /// Positional read; leaves the cursor alone.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize>;
    /// Up to `n` entries when `n > 0`, continuing from the previous call;
    /// everything remaining otherwise.
    fn readdir(&mut self, n: isize) -> Result<Vec<FileInfo>>;
    fn readdirnames(&mut self, n: isize) -> Result<Vec<String>>;
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64>;
    fn stat(&self) -> Result<FileInfo>;
    fn sync(&self) -> Result<()>;
    fn truncate(&self, size: u64) -> Result<()>;
    fn write(&mut self, buf: &[u8]) -> Result<usize>;
    /// Positional write; leaves the cursor alone.
    fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize>;
    fn write_string(&mut self, s: &str) -> Result<usize> {
        self.write(s.as_bytes())
    }
}
