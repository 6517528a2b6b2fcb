//! Shell state and embedding API

use crate::error::{ShellError, ShellResult};
use crate::eval::runtime::Runtime;
use crate::eval::{ExecContext, Output};
use sandsh_vfs::Vfs;
use std::collections::HashMap;
use std::sync::Arc;

/// A host-registered builtin command.
///
/// Receives the expanded arguments and mutable access to the shell.
pub type BuiltinFn = Arc<dyn Fn(&[String], &mut Shell) -> ShellResult<i32> + Send + Sync>;

/// Output captured from [`Shell::execute_capture`].
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

pub struct Shell {
    pub vfs: Arc<Vfs>,
    pub env: HashMap<String, String>,
    pub functions: HashMap<String, String>,
    pub aliases: HashMap<String, String>,
    pub(crate) custom_builtins: HashMap<String, BuiltinFn>,
    pub(crate) runtimes: HashMap<String, Arc<dyn Runtime>>,
    pub history: Vec<String>,
    pub last_exit_code: i32,
    pub(crate) pid: u32,
}

impl Shell {
    pub fn new() -> Self {
        Self::with_vfs(Arc::new(Vfs::new()))
    }

    /// Create a shell over an existing filesystem, so several shells
    /// (or the host application) can share one sandbox.
    pub fn with_vfs(vfs: Arc<Vfs>) -> Self {
        Self {
            vfs,
            env: HashMap::new(),
            functions: HashMap::new(),
            aliases: HashMap::new(),
            custom_builtins: HashMap::new(),
            runtimes: HashMap::new(),
            history: Vec::new(),
            last_exit_code: 0,
            pid: std::process::id(),
        }
    }

    /// Execute a command string, writing output to the process stdout/stderr.
    pub async fn execute(&mut self, input: &str) -> ShellResult<i32> {
        self.record_history(input);
        let script = self.parse_input(input)?;
        self.execute_script(&script).await
    }

    /// Execute a command string, capturing stdout and stderr.
    ///
    /// Never returns an error: parse failures yield exit code 2,
    /// `exit N` yields N, and runtime errors yield 1 with the message
    /// on stderr.
    pub async fn execute_capture(&mut self, input: &str) -> CapturedOutput {
        self.record_history(input);
        let script = match self.parse_input(input) {
            Ok(script) => script,
            Err(e) => {
                self.last_exit_code = 2;
                return CapturedOutput {
                    exit_code: 2,
                    stdout: String::new(),
                    stderr: format!("{}\n", e),
                };
            }
        };

        let mut ctx = ExecContext {
            stdout: Output::Buffer(Vec::new()),
            stderr: Output::Buffer(Vec::new()),
            ..Default::default()
        };

        let exit_code = match self.execute_script_with(&script, &mut ctx).await {
            Ok(code) => code,
            Err(ShellError::Exit(code)) => code,
            Err(e) => {
                let _ = ctx.stderr.writeln(&e.to_string());
                1
            }
        };
        self.last_exit_code = exit_code;

        let stdout = match ctx.stdout {
            Output::Buffer(buf) => String::from_utf8_lossy(&buf).into_owned(),
            _ => String::new(),
        };
        let stderr = match ctx.stderr {
            Output::Buffer(buf) => String::from_utf8_lossy(&buf).into_owned(),
            _ => String::new(),
        };

        CapturedOutput {
            exit_code,
            stdout,
            stderr,
        }
    }

    pub(crate) fn parse_input(&self, input: &str) -> ShellResult<crate::ast::Script> {
        let expanded = crate::brace::expand_braces(input);
        crate::parser::parse(&expanded).map_err(|errs| {
            let msg = errs
                .into_iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            ShellError::Parse(msg)
        })
    }

    fn record_history(&mut self, input: &str) {
        let trimmed = input.trim();
        if !trimmed.is_empty() {
            self.history.push(trimmed.to_string());
        }
    }

    /// Set an environment variable
    pub fn set_var(&mut self, name: &str, value: &str) {
        self.env.insert(name.to_string(), value.to_string());
    }

    /// Get an environment variable
    pub fn get_var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(|s| s.as_str())
    }

    /// Define a function (body is the serialized statement list)
    pub fn define_function(&mut self, name: &str, body: &str) {
        self.functions.insert(name.to_string(), body.to_string());
    }

    /// Get a function definition
    pub fn get_function(&self, name: &str) -> Option<&str> {
        self.functions.get(name).map(|s| s.as_str())
    }

    /// Register a host builtin. It is consulted after the shell's own
    /// builtins, so it cannot shadow them.
    pub fn register_builtin(&mut self, name: &str, f: BuiltinFn) {
        self.custom_builtins.insert(name.to_string(), f);
    }

    /// Register a language runtime under a command name (e.g. "python").
    pub fn register_runtime(&mut self, name: &str, runtime: Arc<dyn Runtime>) {
        self.runtimes.insert(name.to_string(), runtime);
    }

    pub fn runtime(&self, name: &str) -> Option<Arc<dyn Runtime>> {
        self.runtimes.get(name).cloned()
    }

    pub fn runtime_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.runtimes.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for embedding a shell into a host application.
#[derive(Default)]
pub struct ShellBuilder {
    vfs: Option<Arc<Vfs>>,
    env: Vec<(String, String)>,
    builtins: Vec<(String, BuiltinFn)>,
    runtimes: Vec<(String, Arc<dyn Runtime>)>,
}

impl ShellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vfs(mut self, vfs: Arc<Vfs>) -> Self {
        self.vfs = Some(vfs);
        self
    }

    pub fn env(mut self, name: &str, value: &str) -> Self {
        self.env.push((name.to_string(), value.to_string()));
        self
    }

    pub fn builtin(mut self, name: &str, f: BuiltinFn) -> Self {
        self.builtins.push((name.to_string(), f));
        self
    }

    pub fn runtime(mut self, name: &str, runtime: Arc<dyn Runtime>) -> Self {
        self.runtimes.push((name.to_string(), runtime));
        self
    }

    pub fn build(self) -> Shell {
        let mut shell = match self.vfs {
            Some(vfs) => Shell::with_vfs(vfs),
            None => Shell::new(),
        };
        for (name, value) in self.env {
            shell.set_var(&name, &value);
        }
        for (name, f) in self.builtins {
            shell.register_builtin(&name, f);
        }
        for (name, runtime) in self.runtimes {
            shell.register_runtime(&name, runtime);
        }
        shell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_creation() {
        let shell = Shell::new();
        assert_eq!(shell.vfs.cwd(), "/");
        assert_eq!(shell.last_exit_code, 0);
    }

    #[test]
    fn variable_operations() {
        let mut shell = Shell::default();
        shell.set_var("FOO", "bar");
        assert_eq!(shell.get_var("FOO"), Some("bar"));
        assert_eq!(shell.get_var("NONEXISTENT"), None);
    }

    #[test]
    fn function_operations() {
        let mut shell = Shell::default();
        shell.define_function("greet", "[]");
        assert_eq!(shell.get_function("greet"), Some("[]"));
        assert_eq!(shell.get_function("nonexistent"), None);
    }

    #[test]
    fn builder_seeds_env() {
        let shell = ShellBuilder::new().env("USER", "alice").build();
        assert_eq!(shell.get_var("USER"), Some("alice"));
    }

    #[tokio::test]
    async fn capture_parse_error_exits_2() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("if true; then").await;
        assert_eq!(out.exit_code, 2);
        assert!(out.stderr.contains("Parse error"));
    }
}
