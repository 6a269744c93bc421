//! Environment table and shell-style variable expansion

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use crate::error::Errno;

/// Key/value environment guarded by its own lock.
///
/// Never acquired together with the namespace lock.
#[derive(Debug, Default)]
pub struct Environment {
    vars: RwLock<HashMap<String, String>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vars(seed: &BTreeMap<String, String>) -> Self {
        Self {
            vars: RwLock::new(seed.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        }
    }

    /// Value of `key`, or the empty string when unset.
    pub fn get(&self, key: &str) -> String {
        self.lookup(key).unwrap_or_default()
    }

    pub fn lookup(&self, key: &str) -> Option<String> {
        let vars = self.vars.read().unwrap_or_else(PoisonError::into_inner);
        vars.get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), Errno> {
        if key.is_empty() || key.contains('=') || key.contains('\0') || value.contains('\0') {
            return Err(Errno::InvalidArgument);
        }
        let mut vars = self.vars.write().unwrap_or_else(PoisonError::into_inner);
        vars.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn unset(&self, key: &str) {
        let mut vars = self.vars.write().unwrap_or_else(PoisonError::into_inner);
        vars.remove(key);
    }

    pub fn clear(&self) {
        let mut vars = self.vars.write().unwrap_or_else(PoisonError::into_inner);
        vars.clear();
    }

    /// `key=value` pairs in no particular order.
    pub fn environ(&self) -> Vec<String> {
        let vars = self.vars.read().unwrap_or_else(PoisonError::into_inner);
        vars.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

fn is_shell_special(c: u8) -> bool {
    matches!(c, b'*' | b'#' | b'$' | b'@' | b'!' | b'?' | b'-' | b'0'..=b'9')
}

fn is_name_char(c: u8) -> bool {
    c == b'_' || c.is_ascii_alphanumeric()
}

/// Parse the variable name following a `$`.
///
/// Returns the name and the number of bytes consumed. An empty name with a
/// non-zero width is bad syntax whose bytes are dropped.
fn shell_name(s: &str) -> (&str, usize) {
    let bytes = s.as_bytes();
    if bytes[0] == b'{' {
        if bytes.len() > 2 && is_shell_special(bytes[1]) && bytes[2] == b'}' {
            return (&s[1..2], 3);
        }
        for (i, &c) in bytes.iter().enumerate().skip(1) {
            if c == b'}' {
                if i == 1 {
                    return ("", 2);
                }
                return (&s[1..i], i + 1);
            }
        }
        return ("", 1);
    }
    if is_shell_special(bytes[0]) {
        return (&s[0..1], 1);
    }
    let width = bytes.iter().take_while(|c| is_name_char(**c)).count();
    (&s[..width], width)
}

/// Replace `$var` and `${var}` in `s` using `mapping`.
pub fn expand(s: &str, mapping: &dyn Fn(&str) -> String) -> String {
    let bytes = s.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut j = 0;
    while j < bytes.len() {
        if bytes[j] == b'$' && j + 1 < bytes.len() {
            let buf = out.get_or_insert_with(|| String::with_capacity(2 * s.len()));
            buf.push_str(&s[copied..j]);
            let (name, width) = shell_name(&s[j + 1..]);
            if name.is_empty() && width > 0 {
                // bad syntax, eat it
            } else if name.is_empty() {
                buf.push('$');
            } else {
                buf.push_str(&mapping(name));
            }
            j += width;
            copied = j + 1;
        }
        j += 1;
    }
    match out {
        Some(mut buf) => {
            buf.push_str(&s[copied.min(s.len())..]);
            buf
        }
        None => s.to_string(),
    }
}
