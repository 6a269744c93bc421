//! Lexical path handling for the namespace store.
//!
//! Store keys are normalized absolute paths: they start with `/`, carry no
//! `.`/`..` components, no repeated separators and no trailing separator
//! (except the root itself). Symlinks are not consulted here.

use crate::error::Errno;
use crate::types::PATH_SEPARATOR;

pub const ROOT: &str = "/";

/// Normalize `path`, resolving relative paths against `cwd`.
pub fn normalize(path: &str, cwd: &str) -> Result<String, Errno> {
    if path.is_empty() {
        return Err(Errno::NotFound);
    }
    if path.contains('\0') {
        return Err(Errno::InvalidArgument);
    }

    let mut parts: Vec<&str> = Vec::new();
    let absolute = path.starts_with(PATH_SEPARATOR);
    let sources: [&str; 2] = if absolute { ["", path] } else { [cwd, path] };
    for source in sources {
        for component in source.split(PATH_SEPARATOR) {
            match component {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                name => parts.push(name),
            }
        }
    }

    if parts.is_empty() {
        return Ok(ROOT.to_string());
    }
    let mut out = String::with_capacity(path.len() + cwd.len());
    for part in parts {
        out.push(PATH_SEPARATOR);
        out.push_str(part);
    }
    Ok(out)
}

/// Parent of a normalized path; `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind(PATH_SEPARATOR) {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Last component of a normalized path; the root is its own base name.
pub fn base_name(path: &str) -> &str {
    if path == ROOT {
        return ROOT;
    }
    match path.rfind(PATH_SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

pub fn join(dir: &str, name: &str) -> String {
    if dir == ROOT {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// True when `path` equals `ancestor` or lies beneath it, component-wise.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if ancestor == ROOT {
        return true;
    }
    match path.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with(PATH_SEPARATOR),
        None => false,
    }
}

/// Replace the `from` prefix of `path` with `to`. `path` must be within `from`.
pub fn rebase(path: &str, from: &str, to: &str) -> String {
    let rest = if from == ROOT {
        path
    } else {
        &path[from.len()..]
    };
    if rest.is_empty() {
        to.to_string()
    } else if to == ROOT {
        rest.to_string()
    } else {
        format!("{to}{rest}")
    }
}

/// Every ancestor-or-self prefix of a normalized path, shallowest first,
/// excluding the root: `/a/b` yields `/a`, `/a/b`.
pub fn prefixes(path: &str) -> impl Iterator<Item = &str> {
    path.char_indices()
        .filter(|&(idx, c)| c == PATH_SEPARATOR && idx > 0)
        .map(move |(idx, _)| &path[..idx])
        .chain(std::iter::once(path).filter(|p| *p != ROOT))
}
