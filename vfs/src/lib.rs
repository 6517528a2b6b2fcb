//! sandsh-vfs - In-memory virtual filesystem for the sandsh shell
//!
//! A strictly hierarchical tree of file and directory nodes with POSIX-style
//! error reporting. The tree is wholly owned by the [`Vfs`]; nodes carry no
//! back-references, there are no hardlinks or symlinks, and the root is
//! always a directory.

mod error;
mod node;
mod path;
mod vfs;

pub use error::{VfsError, VfsResult};
pub use node::{FileStat, FileType, Inode};
pub use path::{join, normalize, split_parent};
pub use vfs::Vfs;
