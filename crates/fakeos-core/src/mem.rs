//! In-memory driver: simulates filesystem and process-identity state
//! without touching real storage.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::config::SimConfig;
use crate::driver::{Driver, File};
use crate::env::{self, Environment};
use crate::error::{Errno, OsError, Result};
use crate::handle::MemFile;
use crate::identity::Identity;
use crate::node::Node;
use crate::path::{self, ROOT};
use crate::store::Namespace;
use crate::types::{FileInfo, FileMode, OpenFlags};

/// First descriptor handed out; 0-2 belong to the standard streams.
const FIRST_FD: u64 = 3;

fn path_err<'a>(op: &'static str, name: &'a str) -> impl Fn(Errno) -> OsError + 'a {
    move |cause| OsError::path(op, name, cause)
}

fn link_err<'a>(op: &'static str, old: &'a str, new: &'a str) -> impl Fn(Errno) -> OsError + 'a {
    move |cause| OsError::link(op, old, new, cause)
}

#[derive(Debug)]
struct Inner {
    namespace: Namespace,
    env: Environment,
    identity: Identity,
    temp_dir: String,
    max_file_size: u64,
    next_fd: AtomicU64,
    exit_code: Mutex<Option<i32>>,
}

/// The simulator. Cheap to clone; clones share all state.
#[derive(Clone, Debug)]
pub struct MemDriver {
    inner: Arc<Inner>,
}

impl MemDriver {
    pub fn new(config: SimConfig) -> Result<Self> {
        let identity = Identity::from_config(&config.identity);
        let temp_dir = path::normalize(&config.temp_dir, ROOT)
            .map_err(path_err("tempdir", &config.temp_dir))?;
        let namespace = Namespace::new(&temp_dir, (identity.uid, identity.gid))
            .map_err(path_err("tempdir", &config.temp_dir))?;
        debug!(
            "fakeos driver up: uid={} gid={} tmp={}",
            identity.uid, identity.gid, temp_dir
        );
        Ok(Self {
            inner: Arc::new(Inner {
                namespace,
                env: Environment::with_vars(&config.env),
                identity,
                temp_dir,
                max_file_size: config.max_file_size,
                next_fd: AtomicU64::new(FIRST_FD),
                exit_code: Mutex::new(None),
            }),
        })
    }

    /// Code passed to the last `exit` call, if any.
    pub fn exit_code(&self) -> Option<i32> {
        *self
            .inner
            .exit_code
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    pub(crate) fn dev(&self) -> u64 {
        self.inner.namespace.dev()
    }

    fn owner(&self) -> (u32, u32) {
        (self.inner.identity.uid, self.inner.identity.gid)
    }

    fn new_node(&self, build: impl FnOnce(u64) -> Node) -> Arc<Node> {
        Arc::new(build(self.inner.namespace.allocate_ino()))
    }

    fn new_regular(&self, perm: u32) -> Arc<Node> {
        self.new_node(|ino| {
            Node::regular(ino, perm, self.owner()).with_max_len(self.inner.max_file_size)
        })
    }

    /// `path` is the normalized requested path, `resolved` the one left
    /// after following symlinks.
    fn handle(
        &self,
        node: Arc<Node>,
        name: &str,
        path: String,
        resolved: String,
        flags: OpenFlags,
    ) -> Box<dyn File> {
        let fd = self.inner.next_fd.fetch_add(1, Ordering::Relaxed);
        Box::new(MemFile::new(self.clone(), node, name, path, resolved, fd, flags))
    }

    /// Immediate children of `dir` as metadata snapshots, sorted by name.
    pub(crate) fn list_dir(&self, dir: &str) -> Vec<FileInfo> {
        let dev = self.dev();
        let tree = self.inner.namespace.lock();
        tree.children(dir)
            .into_iter()
            .map(|(name, node)| node.info(&name, dev))
            .collect()
    }

    fn with_resolved(&self, op: &'static str, name: &str, apply: impl FnOnce(&Node)) -> Result<()> {
        let tree = self.inner.namespace.lock();
        let err = path_err(op, name);
        let normalized = tree.normalize(name).map_err(&err)?;
        let (_, node) = tree.resolve(&normalized).map_err(&err)?;
        apply(node.as_ref());
        debug!("{} {}", op, normalized);
        Ok(())
    }
}

impl Driver for MemDriver {
    fn chdir(&self, dir: &str) -> Result<()> {
        let mut tree = self.inner.namespace.lock();
        let err = path_err("chdir", dir);
        let normalized = tree.normalize(dir).map_err(&err)?;
        let (resolved, node) = tree.resolve(&normalized).map_err(&err)?;
        if !node.is_dir() {
            return Err(err(Errno::InvalidArgument));
        }
        debug!("chdir {}", resolved);
        tree.set_cwd(resolved);
        Ok(())
    }

    fn chmod(&self, name: &str, mode: FileMode) -> Result<()> {
        self.with_resolved("chmod", name, |node| node.set_perm(mode.perm()))
    }

    fn chown(&self, name: &str, uid: u32, gid: u32) -> Result<()> {
        self.with_resolved("chown", name, |node| node.set_owner(uid, gid))
    }

    fn chtimes(&self, name: &str, atime: SystemTime, mtime: SystemTime) -> Result<()> {
        self.with_resolved("chtimes", name, |node| node.set_times(atime, mtime))
    }

    fn lchown(&self, name: &str, uid: u32, gid: u32) -> Result<()> {
        let tree = self.inner.namespace.lock();
        let err = path_err("lchown", name);
        let normalized = tree.normalize(name).map_err(&err)?;
        tree.lookup(&normalized).map_err(&err)?.set_owner(uid, gid);
        Ok(())
    }

    fn clearenv(&self) {
        self.inner.env.clear();
    }

    fn environ(&self) -> Vec<String> {
        self.inner.env.environ()
    }

    fn getenv(&self, key: &str) -> String {
        self.inner.env.get(key)
    }

    fn setenv(&self, key: &str, value: &str) -> Result<()> {
        self.inner
            .env
            .set(key, value)
            .map_err(|cause| OsError::syscall("setenv", cause))
    }

    fn expand(&self, s: &str, mapping: &dyn Fn(&str) -> String) -> String {
        env::expand(s, mapping)
    }

    fn expand_env(&self, s: &str) -> String {
        env::expand(s, &|key| self.getenv(key))
    }

    fn getegid(&self) -> u32 {
        self.inner.identity.gid
    }

    fn geteuid(&self) -> u32 {
        self.inner.identity.uid
    }

    fn getgid(&self) -> u32 {
        self.inner.identity.gid
    }

    fn getuid(&self) -> u32 {
        self.inner.identity.uid
    }

    fn getgroups(&self) -> Result<Vec<u32>> {
        Err(OsError::syscall("getgroups", Errno::Unsupported))
    }

    fn getpagesize(&self) -> usize {
        self.inner.identity.pagesize
    }

    fn getpid(&self) -> u32 {
        self.inner.identity.pid
    }

    fn getppid(&self) -> u32 {
        self.inner.identity.ppid
    }

    fn getwd(&self) -> Result<String> {
        Ok(self.inner.namespace.lock().cwd().to_string())
    }

    fn hostname(&self) -> Result<String> {
        Ok(self.inner.identity.hostname.clone())
    }

    fn exit(&self, code: i32) {
        warn!("simulated process exit with code {}", code);
        *self
            .inner
            .exit_code
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(code);
    }

    fn link(&self, old: &str, new: &str) -> Result<()> {
        let mut tree = self.inner.namespace.lock();
        let err = link_err("link", old, new);
        let old_path = tree.normalize(old).map_err(&err)?;
        let new_path = tree.normalize(new).map_err(&err)?;
        let node = Arc::clone(tree.lookup(&old_path).map_err(&err)?);
        if node.is_dir() {
            return Err(err(Errno::InvalidArgument));
        }
        if tree.contains(&new_path) {
            return Err(err(Errno::AlreadyExists));
        }
        tree.parent_dir(&new_path).map_err(&err)?;
        debug!("link {} -> {}", new_path, old_path);
        tree.insert(new_path, node).map_err(&err)
    }

    fn mkdir(&self, name: &str, perm: FileMode) -> Result<()> {
        let mut tree = self.inner.namespace.lock();
        let err = path_err("mkdir", name);
        let normalized = tree.normalize(name).map_err(&err)?;
        if tree.contains(&normalized) {
            return Err(err(Errno::AlreadyExists));
        }
        let owner = tree.parent_dir(&normalized).map_err(&err)?.owner();
        let node = self.new_node(|ino| Node::directory(ino, perm.perm(), owner));
        debug!("mkdir {}", normalized);
        tree.insert(normalized, node).map_err(&err)
    }

    fn mkdir_all(&self, path: &str, perm: FileMode) -> Result<()> {
        let mut tree = self.inner.namespace.lock();
        let err = path_err("mkdir", path);
        let normalized = tree.normalize(path).map_err(&err)?;
        for dir in path::prefixes(&normalized) {
            if let Ok(existing) = tree.lookup(dir) {
                if !existing.is_dir() {
                    return Err(OsError::path("mkdir", dir, Errno::InvalidArgument));
                }
                continue;
            }
            let owner = tree
                .parent_dir(dir)
                .map_err(|cause| OsError::path("mkdir", dir, cause))?
                .owner();
            let node = self.new_node(|ino| Node::directory(ino, perm.perm(), owner));
            debug!("mkdir {}", dir);
            tree.insert(dir.to_string(), node).map_err(&err)?;
        }
        Ok(())
    }

    fn readlink(&self, name: &str) -> Result<String> {
        let tree = self.inner.namespace.lock();
        let err = path_err("readlink", name);
        let normalized = tree.normalize(name).map_err(&err)?;
        let node = tree.lookup(&normalized).map_err(&err)?;
        node.target()
            .map(str::to_string)
            .ok_or_else(|| err(Errno::InvalidArgument))
    }

    fn remove(&self, name: &str) -> Result<()> {
        let mut tree = self.inner.namespace.lock();
        let err = path_err("remove", name);
        let normalized = tree.normalize(name).map_err(&err)?;
        if normalized == ROOT {
            return Err(err(Errno::InvalidArgument));
        }
        tree.delete(&normalized).map_err(&err)?;
        debug!("remove {}", normalized);
        Ok(())
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        let mut tree = self.inner.namespace.lock();
        let err = path_err("removeall", path);
        let normalized = tree.normalize(path).map_err(&err)?;
        if normalized == ROOT {
            return Err(err(Errno::InvalidArgument));
        }
        let removed = tree.remove_tree(&normalized);
        debug!("removeall {} ({} entries)", normalized, removed);
        Ok(())
    }

    fn rename(&self, old: &str, new: &str) -> Result<()> {
        let mut tree = self.inner.namespace.lock();
        let err = link_err("rename", old, new);
        let old_path = tree.normalize(old).map_err(&err)?;
        let new_path = tree.normalize(new).map_err(&err)?;
        if !tree.contains(&old_path) {
            return Err(err(Errno::NotFound));
        }
        if old_path == ROOT || new_path == ROOT {
            return Err(err(Errno::InvalidArgument));
        }
        tree.parent_dir(&new_path).map_err(&err)?;
        tree.move_binding(&old_path, &new_path).map_err(&err)?;
        debug!("rename {} -> {}", old_path, new_path);
        Ok(())
    }

    fn symlink(&self, old: &str, new: &str) -> Result<()> {
        let mut tree = self.inner.namespace.lock();
        let err = link_err("symlink", old, new);
        if old.is_empty() {
            return Err(err(Errno::InvalidArgument));
        }
        let new_path = tree.normalize(new).map_err(&err)?;
        if tree.contains(&new_path) {
            return Err(err(Errno::AlreadyExists));
        }
        tree.parent_dir(&new_path).map_err(&err)?;
        let node = self.new_node(|ino| Node::symlink(ino, old, self.owner()));
        debug!("symlink {} -> {}", new_path, old);
        tree.insert(new_path, node).map_err(&err)
    }

    fn temp_dir(&self) -> String {
        self.inner.temp_dir.clone()
    }

    fn truncate(&self, name: &str, size: u64) -> Result<()> {
        let tree = self.inner.namespace.lock();
        let err = path_err("truncate", name);
        let normalized = tree.normalize(name).map_err(&err)?;
        let (_, node) = tree.resolve(&normalized).map_err(&err)?;
        node.truncate(size).map_err(&err)
    }

    fn create(&self, name: &str) -> Result<Box<dyn File>> {
        let mut tree = self.inner.namespace.lock();
        let err = path_err("open", name);
        let normalized = tree.normalize(name).map_err(&err)?;
        if tree.contains(&normalized) {
            return Err(err(Errno::AlreadyExists));
        }
        tree.parent_dir(&normalized).map_err(&err)?;
        let node = self.new_regular(0o666);
        tree.insert(normalized.clone(), Arc::clone(&node)).map_err(&err)?;
        debug!("create {}", normalized);
        let flags = OpenFlags::RDWR | OpenFlags::CREATE;
        Ok(self.handle(node, name, normalized.clone(), normalized, flags))
    }

    fn new_file(&self, fd: u64, name: &str) -> Box<dyn File> {
        let node = self.new_regular(0o666);
        Box::new(MemFile::new(
            self.clone(),
            node,
            name,
            name.to_string(),
            name.to_string(),
            fd,
            OpenFlags::RDWR,
        ))
    }

    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        self.open_file(name, OpenFlags::RDONLY, FileMode::new(0))
    }

    fn open_file(&self, name: &str, flags: OpenFlags, perm: FileMode) -> Result<Box<dyn File>> {
        let mut tree = self.inner.namespace.lock();
        let err = path_err("open", name);
        let normalized = tree.normalize(name).map_err(&err)?;
        let create = flags.contains(OpenFlags::CREATE);
        let exclusive = create && flags.contains(OpenFlags::EXCL);

        if exclusive && tree.contains(&normalized) {
            return Err(err(Errno::AlreadyExists));
        }
        match tree.resolve(&normalized) {
            Ok((resolved, node)) => {
                if flags.contains(OpenFlags::TRUNC) {
                    node.truncate(0).map_err(&err)?;
                }
                Ok(self.handle(node, name, normalized, resolved, flags))
            }
            Err(Errno::NotFound) if create && !tree.contains(&normalized) => {
                tree.parent_dir(&normalized).map_err(&err)?;
                let node = self.new_regular(perm.perm());
                tree.insert(normalized.clone(), Arc::clone(&node)).map_err(&err)?;
                debug!("create {}", normalized);
                Ok(self.handle(node, name, normalized.clone(), normalized, flags))
            }
            Err(cause) => Err(err(cause)),
        }
    }

    fn pipe(&self) -> Result<(Box<dyn File>, Box<dyn File>)> {
        Err(OsError::syscall("pipe", Errno::Unsupported))
    }

    fn lstat(&self, name: &str) -> Result<FileInfo> {
        let tree = self.inner.namespace.lock();
        let err = path_err("lstat", name);
        let normalized = tree.normalize(name).map_err(&err)?;
        let node = tree.lookup(&normalized).map_err(&err)?;
        Ok(node.info(path::base_name(&normalized), self.dev()))
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        let tree = self.inner.namespace.lock();
        let err = path_err("stat", name);
        let normalized = tree.normalize(name).map_err(&err)?;
        let (_, node) = tree.resolve(&normalized).map_err(&err)?;
        Ok(node.info(path::base_name(&normalized), self.dev()))
    }
}
