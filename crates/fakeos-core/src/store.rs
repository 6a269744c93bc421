//! Namespace store: normalized absolute path -> shared node.
//!
//! The whole mapping (and the working directory) sits behind one
//! store-wide lock. Composite operations take the guard once and run their
//! existence checks and mutations inside the same critical section.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Errno;
use crate::node::Node;
use crate::path::{self, ROOT};

/// Maximum symlinks followed while resolving one path (Linux MAXSYMLINKS)
pub const MAX_SYMLINK_HOPS: usize = 40;

static NEXT_DEV: AtomicU64 = AtomicU64::new(1);

/// State guarded by the store lock
#[derive(Debug)]
pub struct Tree {
    entries: BTreeMap<String, Arc<Node>>,
    cwd: String,
}

impl Tree {
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn set_cwd(&mut self, dir: String) {
        self.cwd = dir;
    }

    /// Normalize a caller-supplied path against the working directory.
    pub fn normalize(&self, name: &str) -> Result<String, Errno> {
        path::normalize(name, &self.cwd)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn lookup(&self, path: &str) -> Result<&Arc<Node>, Errno> {
        self.entries.get(path).ok_or(Errno::NotFound)
    }

    /// Bind `path` to `node`; fails if the path is already bound.
    pub fn insert(&mut self, path: String, node: Arc<Node>) -> Result<(), Errno> {
        if self.entries.contains_key(&path) {
            return Err(Errno::AlreadyExists);
        }
        self.entries.insert(path, node);
        Ok(())
    }

    /// Remove exactly one binding.
    pub fn delete(&mut self, path: &str) -> Result<Arc<Node>, Errno> {
        self.entries.remove(path).ok_or(Errno::NotFound)
    }

    /// Move the binding at `old` (and every binding beneath it) to `new`,
    /// replacing whatever `new` was bound to.
    pub fn move_binding(&mut self, old: &str, new: &str) -> Result<(), Errno> {
        if !self.entries.contains_key(old) {
            return Err(Errno::NotFound);
        }
        if old == new {
            return Ok(());
        }
        if old == ROOT || path::is_within(new, old) || path::is_within(old, new) {
            return Err(Errno::InvalidArgument);
        }

        self.remove_tree(new);
        for key in self.subtree_keys(old) {
            if let Some(node) = self.entries.remove(&key) {
                self.entries.insert(path::rebase(&key, old, new), node);
            }
        }
        if path::is_within(&self.cwd, old) {
            self.cwd = path::rebase(&self.cwd, old, new);
        }
        Ok(())
    }

    /// Remove `path` and every binding beneath it; returns how many went.
    pub fn remove_tree(&mut self, path: &str) -> usize {
        let keys = self.subtree_keys(path);
        for key in &keys {
            self.entries.remove(key);
        }
        keys.len()
    }

    fn subtree_keys(&self, path: &str) -> Vec<String> {
        let mut keys = Vec::new();
        if self.entries.contains_key(path) {
            keys.push(path.to_string());
        }
        let prefix = if path == ROOT {
            ROOT.to_string()
        } else {
            format!("{path}/")
        };
        keys.extend(
            self.entries
                .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
                .take_while(|(key, _)| key.starts_with(&prefix))
                .filter(|(key, _)| key.as_str() != path)
                .map(|(key, _)| key.clone()),
        );
        keys
    }

    /// Immediate children of `dir`, sorted by name.
    pub fn children(&self, dir: &str) -> Vec<(String, Arc<Node>)> {
        let prefix = if dir == ROOT {
            ROOT.to_string()
        } else {
            format!("{dir}/")
        };
        self.entries
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, node)| {
                let rest = &key[prefix.len()..];
                (!rest.is_empty() && !rest.contains('/')).then(|| (rest.to_string(), Arc::clone(node)))
            })
            .collect()
    }

    /// Follow a chain of symlinks starting at `path` to a non-symlink node.
    ///
    /// Returns the final path and node. A dangling target is `NotFound`, a
    /// chain longer than [`MAX_SYMLINK_HOPS`] is `InvalidArgument`.
    pub fn resolve(&self, path: &str) -> Result<(String, Arc<Node>), Errno> {
        let mut current = path.to_string();
        for _ in 0..=MAX_SYMLINK_HOPS {
            let node = self.lookup(&current)?;
            match node.target() {
                Some(target) => {
                    let next = path::normalize(target, path::parent(&current).unwrap_or(ROOT))?;
                    current = next;
                }
                None => return Ok((current, Arc::clone(node))),
            }
        }
        Err(Errno::InvalidArgument)
    }

    /// The directory that would contain `path`.
    pub fn parent_dir(&self, path: &str) -> Result<&Arc<Node>, Errno> {
        let parent = path::parent(path).ok_or(Errno::InvalidArgument)?;
        let node = self.lookup(parent)?;
        if !node.is_dir() {
            return Err(Errno::InvalidArgument);
        }
        Ok(node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lock-guarded namespace plus node identity allocation
#[derive(Debug)]
pub struct Namespace {
    dev: u64,
    next_ino: AtomicU64,
    tree: Mutex<Tree>,
}

impl Namespace {
    /// Build a namespace holding `/` and `temp_dir` (with its ancestors).
    pub fn new(temp_dir: &str, owner: (u32, u32)) -> Result<Self, Errno> {
        let namespace = Self {
            dev: NEXT_DEV.fetch_add(1, Ordering::Relaxed),
            next_ino: AtomicU64::new(1),
            tree: Mutex::new(Tree {
                entries: BTreeMap::new(),
                cwd: ROOT.to_string(),
            }),
        };

        let temp_dir = path::normalize(temp_dir, ROOT)?;
        {
            let mut tree = namespace.lock();
            let root = Arc::new(Node::directory(namespace.allocate_ino(), 0o755, owner));
            tree.insert(ROOT.to_string(), root)?;
            for dir in path::prefixes(&temp_dir) {
                let perm = if dir == temp_dir { 0o777 } else { 0o755 };
                let node = Arc::new(Node::directory(namespace.allocate_ino(), perm, owner));
                tree.insert(dir.to_string(), node)?;
            }
        }
        Ok(namespace)
    }

    pub fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Device number shared by every node of this namespace
    pub fn dev(&self) -> u64 {
        self.dev
    }

    pub fn allocate_ino(&self) -> u64 {
        self.next_ino.fetch_add(1, Ordering::Relaxed)
    }
}
