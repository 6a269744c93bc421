//! Filesystem node: the metadata and content record of one entity.
//!
//! A node is shared (`Arc<Node>`) by every path bound to it and by every
//! open handle over it. Content and metadata sit behind a per-node lock so
//! that concurrent writers through different handles never interleave
//! within a single write call.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::error::Errno;
use crate::types::{FileInfo, FileKind, FileMode};

/// Largest content a node can hold unless a smaller limit is set
pub const MAX_CONTENT_LEN: u64 = isize::MAX as u64;

#[derive(Debug)]
struct NodeState {
    content: Vec<u8>,
    mode: FileMode,
    uid: u32,
    gid: u32,
    accessed: SystemTime,
    modified: SystemTime,
    changed: SystemTime,
}

#[derive(Debug)]
pub struct Node {
    ino: u64,
    kind: FileKind,
    target: Option<String>,
    max_len: u64,
    state: Mutex<NodeState>,
}

impl Node {
    fn build(ino: u64, kind: FileKind, perm: u32, owner: (u32, u32), target: Option<String>) -> Self {
        let now = SystemTime::now();
        Self {
            ino,
            kind,
            target,
            max_len: MAX_CONTENT_LEN,
            state: Mutex::new(NodeState {
                content: Vec::new(),
                mode: FileMode::for_kind(kind, perm),
                uid: owner.0,
                gid: owner.1,
                accessed: now,
                modified: now,
                changed: now,
            }),
        }
    }

    pub fn regular(ino: u64, perm: u32, owner: (u32, u32)) -> Self {
        Self::build(ino, FileKind::Regular, perm, owner, None)
    }

    pub fn directory(ino: u64, perm: u32, owner: (u32, u32)) -> Self {
        Self::build(ino, FileKind::Directory, perm, owner, None)
    }

    pub fn symlink(ino: u64, target: &str, owner: (u32, u32)) -> Self {
        Self::build(ino, FileKind::Symlink, 0o777, owner, Some(target.to_string()))
    }

    /// Cap the content length; growing past it is `InvalidArgument`.
    pub fn with_max_len(mut self, max_len: u64) -> Self {
        self.max_len = max_len.min(MAX_CONTENT_LEN);
        self
    }

    fn state(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ino(&self) -> u64 {
        self.ino
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Link target, for symlinks only.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn owner(&self) -> (u32, u32) {
        let state = self.state();
        (state.uid, state.gid)
    }

    pub fn len(&self) -> u64 {
        self.state().content.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn info(&self, name: &str, dev: u64) -> FileInfo {
        let state = self.state();
        FileInfo {
            name: name.to_string(),
            size: state.content.len() as u64,
            mode: state.mode,
            modified: state.modified,
            accessed: state.accessed,
            changed: state.changed,
            uid: state.uid,
            gid: state.gid,
            dev,
            ino: self.ino,
        }
    }

    fn require_regular(&self) -> Result<(), Errno> {
        match self.kind {
            FileKind::Regular => Ok(()),
            _ => Err(Errno::InvalidArgument),
        }
    }

    /// Copy bytes starting at `offset` into `buf`; zero at or past the end.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, Errno> {
        self.require_regular()?;
        let state = self.state();
        let len = state.content.len() as u64;
        if offset >= len {
            return Ok(0);
        }
        let start = offset as usize;
        let count = buf.len().min(state.content.len() - start);
        buf[..count].copy_from_slice(&state.content[start..start + count]);
        Ok(count)
    }

    /// Make room for `end` bytes without aborting on a failed allocation.
    fn grow(&self, content: &mut Vec<u8>, end: u64) -> Result<(), Errno> {
        if end > self.max_len {
            return Err(Errno::InvalidArgument);
        }
        let end = usize::try_from(end).map_err(|_| Errno::InvalidArgument)?;
        if end > content.len() {
            content
                .try_reserve_exact(end - content.len())
                .map_err(|_| Errno::InvalidArgument)?;
            content.resize(end, 0);
        }
        Ok(())
    }

    /// Overwrite in place from `offset`, appending what runs past the end.
    /// A gap between the current end and `offset` is zero-filled. An empty
    /// write never changes the content.
    pub fn write_at(&self, data: &[u8], offset: u64) -> Result<usize, Errno> {
        self.require_regular()?;
        if data.is_empty() {
            return Ok(0);
        }
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or(Errno::InvalidArgument)?;
        let mut state = self.state();
        self.grow(&mut state.content, end)?;
        let start = offset as usize;
        let end = start + data.len();
        state.content[start..end].copy_from_slice(data);
        let now = SystemTime::now();
        state.modified = now;
        state.changed = now;
        Ok(data.len())
    }

    /// Append under a single lock acquisition; returns the new end offset.
    pub fn append(&self, data: &[u8]) -> Result<u64, Errno> {
        self.require_regular()?;
        let mut state = self.state();
        if data.is_empty() {
            return Ok(state.content.len() as u64);
        }
        let end = state.content.len() as u64 + data.len() as u64;
        self.grow(&mut state.content, end)?;
        let start = end as usize - data.len();
        state.content[start..].copy_from_slice(data);
        let now = SystemTime::now();
        state.modified = now;
        state.changed = now;
        Ok(state.content.len() as u64)
    }

    /// Cut content to `size` bytes. Never grows the content.
    pub fn truncate(&self, size: u64) -> Result<(), Errno> {
        self.require_regular()?;
        let mut state = self.state();
        if size >= state.content.len() as u64 {
            return Ok(());
        }
        state.content.truncate(size as usize);
        let now = SystemTime::now();
        state.modified = now;
        state.changed = now;
        Ok(())
    }

    pub fn set_perm(&self, perm: u32) {
        let mut state = self.state();
        state.mode = state.mode.with_perm(perm);
        state.changed = SystemTime::now();
    }

    pub fn set_owner(&self, uid: u32, gid: u32) {
        let mut state = self.state();
        state.uid = uid;
        state.gid = gid;
        state.changed = SystemTime::now();
    }

    pub fn set_times(&self, accessed: SystemTime, modified: SystemTime) {
        let mut state = self.state();
        state.accessed = accessed;
        state.modified = modified;
        state.changed = SystemTime::now();
    }

    #[cfg(test)]
    pub(crate) fn content(&self) -> Vec<u8> {
        self.state().content.clone()
    }
}
