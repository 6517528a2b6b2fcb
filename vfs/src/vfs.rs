use crate::error::{VfsError, VfsResult};
use crate::node::{FileStat, Inode};
use crate::path::{join, normalize, split_parent};
use bytes::Bytes;
use std::sync::RwLock;

/// The in-memory filesystem.
///
/// Owns the whole node tree plus the session's current working directory.
/// All paths handed to operations may be relative; they are resolved against
/// the cwd and normalized before the tree is touched. Interior locks make a
/// shared `Arc<Vfs>` usable from the shell and its nested evaluations;
/// command execution itself is sequential per session.
pub struct Vfs {
    root: RwLock<Inode>,
    cwd: RwLock<String>,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Inode::directory()),
            cwd: RwLock::new("/".to_string()),
        }
    }

    /// The current working directory (always absolute and normalized).
    #[must_use]
    pub fn cwd(&self) -> String {
        self.cwd.read().unwrap().clone()
    }

    /// Resolve a possibly-relative path against the cwd.
    #[must_use]
    pub fn resolve(&self, path: &str) -> String {
        normalize(&self.cwd(), path)
    }

    /// Change the working directory; the target must be an existing directory.
    pub fn set_cwd(&self, path: &str) -> VfsResult<()> {
        let resolved = self.resolve(path);
        let root = self.root.read().unwrap();
        let node = lookup(&root, &resolved)?;
        if !node.is_dir() {
            return Err(VfsError::not_directory(&resolved));
        }
        *self.cwd.write().unwrap() = resolved;
        Ok(())
    }

    pub fn stat(&self, path: &str) -> VfsResult<FileStat> {
        let resolved = self.resolve(path);
        let root = self.root.read().unwrap();
        Ok(lookup(&root, &resolved)?.stat())
    }

    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.stat(path).is_ok()
    }

    pub fn read_file(&self, path: &str) -> VfsResult<Bytes> {
        let resolved = self.resolve(path);
        let root = self.root.read().unwrap();
        match lookup(&root, &resolved)? {
            Inode::File { content, .. } => Ok(Bytes::copy_from_slice(content)),
            Inode::Directory { .. } => Err(VfsError::is_directory(&resolved)),
        }
    }

    pub fn read_to_string(&self, path: &str) -> VfsResult<String> {
        let data = self.read_file(path)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Create or overwrite a file. The parent directory chain must already
    /// exist; an existing directory at the target is an error.
    pub fn write_file(&self, path: &str, data: &[u8]) -> VfsResult<()> {
        self.put_file(path, data, false)
    }

    /// Append to a file, creating it if missing.
    pub fn append_file(&self, path: &str, data: &[u8]) -> VfsResult<()> {
        self.put_file(path, data, true)
    }

    fn put_file(&self, path: &str, data: &[u8], append: bool) -> VfsResult<()> {
        let resolved = self.resolve(path);
        let (parent, name) = split_parent(&resolved)
            .ok_or_else(|| VfsError::is_directory(&resolved))?;

        let mut root = self.root.write().unwrap();
        let dir = lookup_dir_mut(&mut root, parent)?;
        match dir.get_mut(name) {
            Some(Inode::Directory { .. }) => Err(VfsError::is_directory(&resolved)),
            Some(node @ Inode::File { .. }) => {
                if let Inode::File { content, .. } = node {
                    if append {
                        content.extend_from_slice(data);
                    } else {
                        content.clear();
                        content.extend_from_slice(data);
                    }
                }
                node.touch();
                Ok(())
            }
            None => {
                dir.insert(name.to_string(), Inode::file(data.to_vec()));
                Ok(())
            }
        }
    }

    /// Create a single directory; the parent must exist.
    pub fn mkdir(&self, path: &str) -> VfsResult<()> {
        let resolved = self.resolve(path);
        let (parent, name) = split_parent(&resolved)
            .ok_or_else(|| VfsError::already_exists(&resolved))?;

        let mut root = self.root.write().unwrap();
        let dir = lookup_dir_mut(&mut root, parent)?;
        if dir.contains_key(name) {
            return Err(VfsError::already_exists(&resolved));
        }
        dir.insert(name.to_string(), Inode::directory());
        Ok(())
    }

    /// Create every missing ancestor, idempotently. Fails with ENOTDIR if an
    /// intermediate segment exists but is a file.
    pub fn mkdir_p(&self, path: &str) -> VfsResult<()> {
        let resolved = self.resolve(path);
        let mut root = self.root.write().unwrap();
        let mut node = &mut *root;
        let mut walked = String::new();

        for seg in resolved.split('/').filter(|s| !s.is_empty()) {
            walked.push('/');
            walked.push_str(seg);
            let children = match node {
                Inode::Directory { children, .. } => children,
                Inode::File { .. } => return Err(VfsError::not_directory(&walked)),
            };
            node = children
                .entry(seg.to_string())
                .or_insert_with(Inode::directory);
            if !node.is_dir() {
                return Err(VfsError::not_directory(&walked));
            }
        }
        Ok(())
    }

    /// Remove an empty directory.
    pub fn rmdir(&self, path: &str) -> VfsResult<()> {
        let resolved = self.resolve(path);
        let (parent, name) = split_parent(&resolved)
            .ok_or_else(|| VfsError::invalid_argument("cannot remove root"))?;

        let mut root = self.root.write().unwrap();
        let dir = lookup_dir_mut(&mut root, parent)?;
        match dir.get(name) {
            None => Err(VfsError::not_found(&resolved)),
            Some(Inode::File { .. }) => Err(VfsError::not_directory(&resolved)),
            Some(Inode::Directory { children, .. }) => {
                if !children.is_empty() {
                    return Err(VfsError::not_empty(&resolved));
                }
                dir.remove(name);
                Ok(())
            }
        }
    }

    /// Remove a file.
    pub fn unlink(&self, path: &str) -> VfsResult<()> {
        let resolved = self.resolve(path);
        let (parent, name) = split_parent(&resolved)
            .ok_or_else(|| VfsError::is_directory(&resolved))?;

        let mut root = self.root.write().unwrap();
        let dir = lookup_dir_mut(&mut root, parent)?;
        match dir.get(name) {
            None => Err(VfsError::not_found(&resolved)),
            Some(Inode::Directory { .. }) => Err(VfsError::is_directory(&resolved)),
            Some(Inode::File { .. }) => {
                dir.remove(name);
                Ok(())
            }
        }
    }

    /// Remove a file or a directory subtree, recursively.
    pub fn remove_all(&self, path: &str) -> VfsResult<()> {
        let resolved = self.resolve(path);
        let (parent, name) = split_parent(&resolved)
            .ok_or_else(|| VfsError::invalid_argument("cannot remove root"))?;

        let mut root = self.root.write().unwrap();
        let dir = lookup_dir_mut(&mut root, parent)?;
        if dir.remove(name).is_none() {
            return Err(VfsError::not_found(&resolved));
        }
        Ok(())
    }

    /// Child names of a directory, lexicographically sorted.
    pub fn readdir(&self, path: &str) -> VfsResult<Vec<String>> {
        let resolved = self.resolve(path);
        let root = self.root.read().unwrap();
        match lookup(&root, &resolved)? {
            Inode::Directory { children, .. } => Ok(children.keys().cloned().collect()),
            Inode::File { .. } => Err(VfsError::not_directory(&resolved)),
        }
    }

    /// Like [`Vfs::readdir`] but with each child's stat, for `ls -l`.
    pub fn readdir_stats(&self, path: &str) -> VfsResult<Vec<(String, FileStat)>> {
        let resolved = self.resolve(path);
        let root = self.root.read().unwrap();
        match lookup(&root, &resolved)? {
            Inode::Directory { children, .. } => Ok(children
                .iter()
                .map(|(name, node)| (name.clone(), node.stat()))
                .collect()),
            Inode::File { .. } => Err(VfsError::not_directory(&resolved)),
        }
    }

    /// Move a node, preserving its content and identity.
    ///
    /// The destination parent is validated before the source is detached, so
    /// a failed rename never strands the node.
    pub fn rename(&self, old: &str, new: &str) -> VfsResult<()> {
        let old_resolved = self.resolve(old);
        let new_resolved = self.resolve(new);
        if old_resolved == new_resolved {
            return Ok(());
        }
        if new_resolved.starts_with(&join(&old_resolved, "")) {
            return Err(VfsError::invalid_argument(
                "cannot move a directory into itself",
            ));
        }

        let (old_parent, old_name) = split_parent(&old_resolved)
            .ok_or_else(|| VfsError::invalid_argument("cannot move root"))?;
        let (new_parent, new_name) = split_parent(&new_resolved)
            .ok_or_else(|| VfsError::invalid_argument("cannot move onto root"))?;

        let mut root = self.root.write().unwrap();

        // Validate both ends up front: source must exist, destination parent
        // must be an existing directory, and the destination itself must not
        // be a directory.
        {
            let src_dir = lookup_dir(&root, old_parent)?;
            if !src_dir.contains_key(old_name) {
                return Err(VfsError::not_found(&old_resolved));
            }
            let dst_dir = lookup_dir(&root, new_parent)?;
            if matches!(dst_dir.get(new_name), Some(Inode::Directory { .. })) {
                return Err(VfsError::is_directory(&new_resolved));
            }
        }

        let node = lookup_dir_mut(&mut root, old_parent)?
            .remove(old_name)
            .ok_or_else(|| VfsError::not_found(&old_resolved))?;
        lookup_dir_mut(&mut root, new_parent)?.insert(new_name.to_string(), node);
        Ok(())
    }
}

fn lookup<'a>(root: &'a Inode, path: &str) -> VfsResult<&'a Inode> {
    let mut node = root;
    let mut walked = String::new();
    for seg in path.split('/').filter(|s| !s.is_empty()) {
        walked.push('/');
        walked.push_str(seg);
        match node {
            Inode::Directory { children, .. } => {
                node = children
                    .get(seg)
                    .ok_or_else(|| VfsError::not_found(&walked))?;
            }
            Inode::File { .. } => return Err(VfsError::not_directory(&walked)),
        }
    }
    Ok(node)
}

fn lookup_dir<'a>(
    root: &'a Inode,
    path: &str,
) -> VfsResult<&'a std::collections::BTreeMap<String, Inode>> {
    match lookup(root, path)? {
        Inode::Directory { children, .. } => Ok(children),
        Inode::File { .. } => Err(VfsError::not_directory(path)),
    }
}

fn lookup_dir_mut<'a>(
    root: &'a mut Inode,
    path: &str,
) -> VfsResult<&'a mut std::collections::BTreeMap<String, Inode>> {
    let mut node = root;
    let mut walked = String::new();
    for seg in path.split('/').filter(|s| !s.is_empty()) {
        walked.push('/');
        walked.push_str(seg);
        match node {
            Inode::Directory { children, .. } => {
                node = children
                    .get_mut(seg)
                    .ok_or_else(|| VfsError::not_found(&walked))?;
            }
            Inode::File { .. } => return Err(VfsError::not_directory(&walked)),
        }
    }
    match node {
        Inode::Directory { children, .. } => Ok(children),
        Inode::File { .. } => Err(VfsError::not_directory(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FileType;

    #[test]
    fn write_then_read_roundtrip() {
        let fs = Vfs::new();
        fs.write_file("/test.txt", b"hello world").unwrap();
        let data = fs.read_file("/test.txt").unwrap();
        assert_eq!(&data[..], b"hello world");
    }

    #[test]
    fn write_requires_existing_parent() {
        let fs = Vfs::new();
        let err = fs.write_file("/no/such/dir.txt", b"x").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn write_over_directory_fails() {
        let fs = Vfs::new();
        fs.mkdir("/d").unwrap();
        assert_eq!(
            fs.write_file("/d", b"x").unwrap_err(),
            VfsError::is_directory("/d")
        );
    }

    #[test]
    fn read_directory_fails() {
        let fs = Vfs::new();
        fs.mkdir("/d").unwrap();
        assert_eq!(fs.read_file("/d").unwrap_err(), VfsError::is_directory("/d"));
    }

    #[test]
    fn mkdir_and_list() {
        let fs = Vfs::new();
        fs.mkdir("/mydir").unwrap();
        fs.write_file("/mydir/b.txt", b"2").unwrap();
        fs.write_file("/mydir/a.txt", b"1").unwrap();

        let entries = fs.readdir("/mydir").unwrap();
        assert_eq!(entries, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[test]
    fn mkdir_existing_fails() {
        let fs = Vfs::new();
        fs.mkdir("/d").unwrap();
        assert_eq!(fs.mkdir("/d").unwrap_err(), VfsError::already_exists("/d"));
    }

    #[test]
    fn mkdir_missing_parent_fails() {
        let fs = Vfs::new();
        assert!(fs.mkdir("/a/b").unwrap_err().is_not_found());
    }

    #[test]
    fn mkdir_p_is_idempotent() {
        let fs = Vfs::new();
        fs.mkdir_p("/a/b/c").unwrap();
        fs.mkdir_p("/a/b/c").unwrap();
        assert!(fs.stat("/a/b/c").unwrap().is_dir());
    }

    #[test]
    fn mkdir_p_through_file_fails() {
        let fs = Vfs::new();
        fs.write_file("/a", b"file").unwrap();
        assert_eq!(
            fs.mkdir_p("/a/b").unwrap_err(),
            VfsError::not_directory("/a")
        );
    }

    #[test]
    fn rmdir_semantics() {
        let fs = Vfs::new();
        fs.mkdir("/d").unwrap();
        fs.write_file("/d/f", b"x").unwrap();
        assert_eq!(fs.rmdir("/d").unwrap_err(), VfsError::not_empty("/d"));
        fs.unlink("/d/f").unwrap();
        fs.rmdir("/d").unwrap();
        assert!(!fs.exists("/d"));
    }

    #[test]
    fn unlink_directory_fails() {
        let fs = Vfs::new();
        fs.mkdir("/d").unwrap();
        assert_eq!(fs.unlink("/d").unwrap_err(), VfsError::is_directory("/d"));
    }

    #[test]
    fn remove_all_is_recursive() {
        let fs = Vfs::new();
        fs.mkdir_p("/d/sub").unwrap();
        fs.write_file("/d/sub/f", b"x").unwrap();
        fs.remove_all("/d").unwrap();
        assert!(!fs.exists("/d"));
    }

    #[test]
    fn rename_preserves_content() {
        let fs = Vfs::new();
        fs.write_file("/old.txt", b"content").unwrap();
        fs.rename("/old.txt", "/new.txt").unwrap();
        assert!(!fs.exists("/old.txt"));
        assert_eq!(&fs.read_file("/new.txt").unwrap()[..], b"content");
    }

    #[test]
    fn rename_missing_dest_parent_keeps_source() {
        let fs = Vfs::new();
        fs.write_file("/f", b"x").unwrap();
        assert!(fs.rename("/f", "/no/dir/f").is_err());
        // Destination parent is validated before detach, so the source survives.
        assert!(fs.exists("/f"));
    }

    #[test]
    fn rename_into_own_subtree_fails() {
        let fs = Vfs::new();
        fs.mkdir_p("/d/sub").unwrap();
        assert!(fs.rename("/d", "/d/sub/d").is_err());
        assert!(fs.exists("/d"));
    }

    #[test]
    fn cwd_resolution() {
        let fs = Vfs::new();
        fs.mkdir_p("/home/user").unwrap();
        fs.set_cwd("/home/user").unwrap();
        fs.write_file("notes.txt", b"hi").unwrap();
        assert!(fs.exists("/home/user/notes.txt"));
        assert_eq!(fs.resolve("../.."), "/");
    }

    #[test]
    fn set_cwd_rejects_files_and_missing() {
        let fs = Vfs::new();
        fs.write_file("/f", b"x").unwrap();
        assert_eq!(fs.set_cwd("/f").unwrap_err(), VfsError::not_directory("/f"));
        assert!(fs.set_cwd("/nope").unwrap_err().is_not_found());
        assert_eq!(fs.cwd(), "/");
    }

    #[test]
    fn append_creates_and_extends() {
        let fs = Vfs::new();
        fs.append_file("/log", b"one\n").unwrap();
        fs.append_file("/log", b"two\n").unwrap();
        assert_eq!(&fs.read_file("/log").unwrap()[..], b"one\ntwo\n");
    }

    #[test]
    fn stat_types() {
        let fs = Vfs::new();
        fs.mkdir("/d").unwrap();
        fs.write_file("/f", b"abc").unwrap();
        assert_eq!(fs.stat("/d").unwrap().file_type, FileType::Directory);
        let st = fs.stat("/f").unwrap();
        assert_eq!(st.file_type, FileType::Regular);
        assert_eq!(st.size, 3);
    }
}
