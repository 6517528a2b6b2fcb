use std::collections::BTreeMap;
use std::time::SystemTime;

/// A node in the filesystem tree.
///
/// Directories own their children by value; removing a child drops its whole
/// subtree. `BTreeMap` keeps `readdir` lexicographically sorted for free.
#[derive(Debug, Clone)]
pub enum Inode {
    File {
        content: Vec<u8>,
        mtime: SystemTime,
        mode: u32,
    },
    Directory {
        children: BTreeMap<String, Inode>,
        mtime: SystemTime,
        mode: u32,
    },
}

impl Inode {
    #[must_use]
    pub fn file(content: Vec<u8>) -> Self {
        Self::File {
            content,
            mtime: SystemTime::now(),
            mode: 0o644,
        }
    }

    #[must_use]
    pub fn directory() -> Self {
        Self::Directory {
            children: BTreeMap::new(),
            mtime: SystemTime::now(),
            mode: 0o755,
        }
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }

    #[must_use]
    pub fn file_type(&self) -> FileType {
        match self {
            Self::File { .. } => FileType::Regular,
            Self::Directory { .. } => FileType::Directory,
        }
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        match self {
            Self::File { content, .. } => content.len() as u64,
            Self::Directory { .. } => 0,
        }
    }

    #[must_use]
    pub fn mtime(&self) -> SystemTime {
        match self {
            Self::File { mtime, .. } | Self::Directory { mtime, .. } => *mtime,
        }
    }

    #[must_use]
    pub fn mode(&self) -> u32 {
        match self {
            Self::File { mode, .. } | Self::Directory { mode, .. } => *mode,
        }
    }

    pub fn touch(&mut self) {
        match self {
            Self::File { mtime, .. } | Self::Directory { mtime, .. } => {
                *mtime = SystemTime::now();
            }
        }
    }

    #[must_use]
    pub fn stat(&self) -> FileStat {
        FileStat {
            file_type: self.file_type(),
            size: self.size(),
            mtime: self.mtime(),
            mode: self.mode(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    Regular,
    Directory,
}

/// Read-only projection of an [`Inode`], as returned by `stat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub file_type: FileType,
    pub size: u64,
    pub mtime: SystemTime,
    pub mode: u32,
}

impl FileStat {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}
