//! Pure string-level path manipulation.
//!
//! The VFS has no symlinks, so `.` and `..` collapse at the segment level
//! without touching the tree.

/// Normalize a path against a base directory.
///
/// Relative paths resolve against `base` (which must be absolute). `.` and
/// `..` segments collapse; `..` at the root stays at the root. The result
/// always begins with `/` and never ends with one (except the root itself).
#[must_use]
pub fn normalize(base: &str, path: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else if base == "/" {
        format!("/{path}")
    } else {
        format!("{base}/{path}")
    };

    let mut segments: Vec<&str> = Vec::new();
    for seg in joined.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Join a directory and a child name into an absolute path.
#[must_use]
pub fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Split an absolute, normalized path into `(parent, name)`.
///
/// Returns `None` for the root, which has no parent.
#[must_use]
pub fn split_parent(path: &str) -> Option<(&str, &str)> {
    if path == "/" {
        return None;
    }
    let idx = path.rfind('/')?;
    let parent = if idx == 0 { "/" } else { &path[..idx] };
    Some((parent, &path[idx + 1..]))
}
