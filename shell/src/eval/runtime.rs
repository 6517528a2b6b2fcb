//! Language runtime adapter contract
//!
//! A runtime executes code in some guest language (Python, JavaScript,
//! ...) against the same sandbox the shell runs in. Hosts register
//! implementations under a command name; `python script.py` then routes
//! to the adapter, and `python` alone drops into its REPL when one is
//! provided.

use async_trait::async_trait;

/// Result of running a chunk of guest code.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// One evaluated REPL line.
#[derive(Debug, Clone, Default)]
pub struct ReplOutcome {
    /// Printable result of the expression, if any
    pub result: Option<String>,
    /// Error message, if evaluation failed
    pub error: Option<String>,
    /// True when the line is incomplete and the REPL should keep
    /// reading continuation lines (e.g. an unclosed block)
    pub continue_input: bool,
}

/// A pluggable language runtime.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Execute a complete program.
    async fn execute(&self, code: &str) -> RuntimeOutput;

    /// Create an interactive session, if the runtime supports one.
    fn create_repl(&self) -> Option<Box<dyn ReplSession>> {
        None
    }
}

/// An interactive runtime session with its own persistent state.
#[async_trait]
pub trait ReplSession: Send {
    /// Evaluate one line of input.
    async fn execute(&mut self, line: &str) -> ReplOutcome;

    /// Prompt to display before the next line.
    fn prompt(&self) -> String;
}
