//! sandsh - Sandboxed POSIX-like shell over an in-memory filesystem
//!
//! This crate provides:
//! - A POSIX-like shell with bash-compatible syntax, confined to a
//!   virtual filesystem (no host filesystem or process access)
//! - Scripting with variables, functions, and control flow
//! - Built-in commands (ls, cat, grep, etc.) implemented natively
//! - An embedding API for host applications, including pluggable
//!   language runtimes and host-registered builtins

pub mod ast;
pub mod brace;
pub mod error;
pub mod eval;
pub mod help;
pub mod lexer;
pub mod parser;
pub mod shell;

pub use error::{ShellError, ShellResult};
pub use eval::runtime::{ReplOutcome, ReplSession, Runtime, RuntimeOutput};
pub use parser::parse;
pub use shell::{BuiltinFn, CapturedOutput, Shell, ShellBuilder};
