//! Open-file handles of the in-memory driver

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::driver::{Driver, File};
use crate::error::{Errno, OsError, Result};
use crate::mem::MemDriver;
use crate::node::Node;
use crate::path;
use crate::types::{FileInfo, FileMode, OpenFlags, Whence};

/// Cursor-bearing view onto a node.
///
/// Several handles may share one node; content written through any of them
/// is visible to all. The handle keeps an explicit reference to the driver
/// that opened it for the path-based pass-through operations, which act on
/// the file's absolute path regardless of later working-directory changes.
pub struct MemFile {
    driver: MemDriver,
    node: Arc<Node>,
    name: String,
    /// Normalized path the file was opened through
    path: String,
    /// `path` with symlinks followed
    resolved: String,
    fd: u64,
    flags: OpenFlags,
    cursor: u64,
    dir_cursor: usize,
    closed: bool,
}

impl MemFile {
    pub(crate) fn new(
        driver: MemDriver,
        node: Arc<Node>,
        name: &str,
        path: String,
        resolved: String,
        fd: u64,
        flags: OpenFlags,
    ) -> Self {
        Self {
            driver,
            node,
            name: name.to_string(),
            path,
            resolved,
            fd,
            flags,
            cursor: 0,
            dir_cursor: 0,
            closed: false,
        }
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    pub fn position(&self) -> u64 {
        self.cursor
    }

    fn err(&self, op: &'static str) -> impl Fn(Errno) -> OsError + '_ {
        move |cause| OsError::path(op, self.name.as_str(), cause)
    }

    fn ensure_open(&self, op: &'static str) -> Result<()> {
        if self.closed {
            return Err(OsError::path(op, self.name.as_str(), Errno::InvalidHandle));
        }
        Ok(())
    }

    fn next_entries(&mut self, op: &'static str, n: isize) -> Result<Vec<FileInfo>> {
        self.ensure_open(op)?;
        if !self.node.is_dir() {
            return Err(OsError::path(op, self.name.as_str(), Errno::InvalidArgument));
        }
        let entries = self.driver.list_dir(&self.resolved);
        let remaining = entries.len().saturating_sub(self.dir_cursor);
        let take = if n > 0 {
            remaining.min(n as usize)
        } else {
            remaining
        };
        let batch: Vec<FileInfo> = entries
            .into_iter()
            .skip(self.dir_cursor)
            .take(take)
            .collect();
        self.dir_cursor += batch.len();
        Ok(batch)
    }
}

impl fmt::Debug for MemFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemFile")
            .field("name", &self.name)
            .field("fd", &self.fd)
            .field("ino", &self.node.ino())
            .field("flags", &self.flags)
            .field("cursor", &self.cursor)
            .field("closed", &self.closed)
            .finish()
    }
}

impl File for MemFile {
    fn chdir(&self) -> Result<()> {
        self.ensure_open("chdir")?;
        self.driver.chdir(&self.resolved)
    }

    fn chmod(&self, mode: FileMode) -> Result<()> {
        self.ensure_open("chmod")?;
        self.driver.chmod(&self.resolved, mode)
    }

    fn chown(&self, uid: u32, gid: u32) -> Result<()> {
        self.ensure_open("chown")?;
        self.driver.chown(&self.resolved, uid, gid)
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_open("close")?;
        self.closed = true;
        trace!("close fd {} ({})", self.fd, self.name);
        Ok(())
    }

    fn fd(&self) -> u64 {
        self.fd
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open("read")?;
        let n = self.node.read_at(buf, self.cursor).map_err(self.err("read"))?;
        self.cursor += n as u64;
        trace!("read {} bytes from fd {}", n, self.fd);
        Ok(n)
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.ensure_open("read")?;
        self.node.read_at(buf, offset).map_err(self.err("read"))
    }

    fn readdir(&mut self, n: isize) -> Result<Vec<FileInfo>> {
        self.next_entries("readdirent", n)
    }

    fn readdirnames(&mut self, n: isize) -> Result<Vec<String>> {
        Ok(self
            .next_entries("readdirent", n)?
            .into_iter()
            .map(|info| info.name)
            .collect())
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        self.ensure_open("seek")?;
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.cursor,
            Whence::End => self.node.len(),
        };
        let position = i64::try_from(base)
            .ok()
            .and_then(|base| base.checked_add(offset))
            .filter(|position| *position >= 0)
            .ok_or_else(|| OsError::path("seek", self.name.as_str(), Errno::InvalidArgument))?;
        self.cursor = position as u64;
        Ok(self.cursor)
    }

    fn stat(&self) -> Result<FileInfo> {
        self.ensure_open("stat")?;
        Ok(self.node.info(path::base_name(&self.path), self.driver.dev()))
    }

    fn sync(&self) -> Result<()> {
        self.ensure_open("sync")
    }

    fn truncate(&self, size: u64) -> Result<()> {
        self.ensure_open("truncate")?;
        self.node.truncate(size).map_err(self.err("truncate"))
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_open("write")?;
        if self.flags.contains(OpenFlags::APPEND) {
            let end = self.node.append(buf).map_err(self.err("write"))?;
            self.cursor = end;
        } else {
            let n = self.node.write_at(buf, self.cursor).map_err(self.err("write"))?;
            self.cursor += n as u64;
        }
        trace!("wrote {} bytes to fd {}", buf.len(), self.fd);
        Ok(buf.len())
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize> {
        self.ensure_open("write")?;
        self.node.write_at(buf, offset).map_err(self.err("write"))
    }
}
