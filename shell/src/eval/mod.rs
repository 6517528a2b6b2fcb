//! Evaluator for sandsh scripts

use crate::ast::*;
use crate::error::{ShellError, ShellResult};
use crate::help::{format_help, get_help, wants_help};
use crate::shell::Shell;
use sandsh_vfs::Vfs;
use std::collections::HashMap;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;

mod arithmetic;
mod builtins_fs;
mod builtins_shell;
mod builtins_text;
mod control_flow;
mod expansion;
pub mod runtime;
mod utils;

pub enum Output {
    Stdout,
    Buffer(Vec<u8>),
    File {
        vfs: Arc<Vfs>,
        path: String,
        buffer: Vec<u8>,
        mode: FileWriteMode,
    },
}

#[derive(Clone, Copy)]
pub enum FileWriteMode {
    Write,  // Overwrite
    Append, // Append
}

impl Output {
    pub fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        match self {
            Output::Stdout => {
                std::io::stdout().write_all(data)?;
                std::io::stdout().flush()
            }
            Output::Buffer(buf) => {
                buf.extend_from_slice(data);
                Ok(())
            }
            Output::File { buffer, .. } => {
                // Just buffer the data, flush will write it
                buffer.extend_from_slice(data);
                Ok(())
            }
        }
    }

    pub fn writeln(&mut self, s: &str) -> std::io::Result<()> {
        self.write(s.as_bytes())?;
        self.write(b"\n")
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Output::Stdout => std::io::stdout().flush(),
            Output::Buffer(_) => Ok(()),
            Output::File {
                vfs,
                path,
                buffer,
                mode,
            } => {
                if !buffer.is_empty() {
                    let to_write = std::mem::take(buffer);
                    let result = match mode {
                        FileWriteMode::Write => {
                            let result = vfs.write_file(path, &to_write);
                            // After the first write, switch to append so a
                            // command that flushes twice does not truncate
                            // its own earlier output
                            *mode = FileWriteMode::Append;
                            result
                        }
                        FileWriteMode::Append => vfs.append_file(path, &to_write),
                    };
                    if let Err(e) = result {
                        let msg = format!("Error flushing to {}: {}\n", path, e);
                        let _ = std::io::stderr().write_all(msg.as_bytes());
                    }
                }
                Ok(())
            }
        }
    }
}

pub struct ExecContext {
    pub locals: HashMap<String, String>,
    pub positional: Vec<String>,
    pub stdin: Option<Vec<u8>>,
    pub stdout: Output,
    pub stderr: Output,
    /// Set by `2>&1`: error output follows stdout
    pub merge_stderr: bool,
    pub should_break: bool,
    pub should_continue: bool,
    pub return_value: Option<i32>,
}

impl Default for ExecContext {
    fn default() -> Self {
        Self {
            locals: HashMap::new(),
            positional: Vec::new(),
            stdin: None,
            stdout: Output::Stdout,
            stderr: Output::Stdout,
            merge_stderr: false,
            should_break: false,
            should_continue: false,
            return_value: None,
        }
    }
}

impl ExecContext {
    pub fn write_err(&mut self, msg: &str) {
        let sink = if self.merge_stderr {
            &mut self.stdout
        } else {
            &mut self.stderr
        };
        match sink {
            Output::Stdout => {
                let msg_with_newline = format!("{}\n", msg);
                let _ = std::io::stderr().write_all(msg_with_newline.as_bytes());
            }
            Output::Buffer(buf) | Output::File { buffer: buf, .. } => {
                buf.extend_from_slice(msg.as_bytes());
                buf.push(b'\n');
            }
        }
    }
}

impl Shell {
    pub async fn execute_script(&mut self, script: &Script) -> ShellResult<i32> {
        let mut ctx = ExecContext::default();
        self.execute_script_with(script, &mut ctx).await
    }

    pub(crate) async fn execute_script_with(
        &mut self,
        script: &Script,
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        let mut last_exit = 0;

        for stmt in &script.statements {
            last_exit = self.execute_statement_boxed(stmt, ctx).await?;
            self.last_exit_code = last_exit;

            if ctx.should_break || ctx.should_continue || ctx.return_value.is_some() {
                break;
            }
        }

        Ok(last_exit)
    }

    pub(crate) fn execute_statement_boxed<'a>(
        &'a mut self,
        stmt: &'a Statement,
        ctx: &'a mut ExecContext,
    ) -> Pin<Box<dyn Future<Output = ShellResult<i32>> + Send + 'a>> {
        Box::pin(self.execute_statement(stmt, ctx))
    }

    async fn execute_statement(
        &mut self,
        stmt: &Statement,
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        match stmt {
            Statement::Empty => Ok(0),

            Statement::Assignment(assign) => {
                let value = self.expand_word(&assign.value, ctx).await?;
                if ctx.locals.contains_key(&assign.name) {
                    ctx.locals.insert(assign.name.clone(), value);
                } else {
                    self.set_var(&assign.name, &value);
                }
                Ok(0)
            }

            Statement::Pipeline(pipeline) => self.execute_pipeline(pipeline, ctx).await,

            Statement::CommandList { first, rest } => {
                let mut exit_code = self.execute_pipeline(first, ctx).await?;
                self.last_exit_code = exit_code;
                for (op, pipeline) in rest {
                    let run = match op {
                        ListOp::And => exit_code == 0,
                        ListOp::Or => exit_code != 0,
                    };
                    if run {
                        exit_code = self.execute_pipeline(pipeline, ctx).await?;
                        self.last_exit_code = exit_code;
                    }
                }
                Ok(exit_code)
            }

            Statement::If(if_stmt) => self.execute_if(if_stmt, ctx).await,
            Statement::For(for_loop) => self.execute_for(for_loop, ctx).await,
            Statement::While(while_loop) => self.execute_while(while_loop, ctx).await,
            Statement::Until(until_loop) => self.execute_until(until_loop, ctx).await,
            Statement::Case(case_stmt) => self.execute_case(case_stmt, ctx).await,

            Statement::FunctionDef(func) => {
                let body_str = serde_json::to_string(&func.body).map_err(|e| {
                    ShellError::Runtime(format!("Failed to serialize function: {}", e))
                })?;
                self.define_function(&func.name, &body_str);
                Ok(0)
            }

            Statement::Break => {
                ctx.should_break = true;
                Ok(0)
            }

            Statement::Continue => {
                ctx.should_continue = true;
                Ok(0)
            }

            Statement::Return(value) => {
                let code = if let Some(word) = value {
                    let expanded = self.expand_word(word, ctx).await?;
                    expanded.parse::<i32>().unwrap_or(0)
                } else {
                    0
                };
                ctx.return_value = Some(code);
                Ok(code)
            }
        }
    }

    /// Run a pipeline stage by stage. Each stage runs to completion and
    /// its buffered stdout becomes the next stage's stdin; stderr is
    /// not piped.
    pub(crate) async fn execute_pipeline(
        &mut self,
        pipeline: &Pipeline,
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        if pipeline.commands.is_empty() {
            return Ok(0);
        }

        if pipeline.commands.len() == 1 {
            return self.execute_command(&pipeline.commands[0], ctx).await;
        }

        // Save the original stdout so the last command writes to the
        // correct destination
        let mut original_stdout =
            Some(std::mem::replace(&mut ctx.stdout, Output::Buffer(Vec::new())));
        let mut input: Option<Vec<u8>> = ctx.stdin.take();

        for (i, cmd) in pipeline.commands.iter().enumerate() {
            let is_last = i == pipeline.commands.len() - 1;

            ctx.stdin = input.take();

            if is_last {
                ctx.stdout = original_stdout.take().unwrap_or(Output::Stdout);
                return self.execute_command(cmd, ctx).await;
            }
            ctx.stdout = Output::Buffer(Vec::new());

            self.execute_command(cmd, ctx).await?;

            if let Output::Buffer(buf) =
                std::mem::replace(&mut ctx.stdout, Output::Buffer(Vec::new()))
            {
                input = Some(buf);
            }
        }

        Ok(0)
    }

    async fn execute_command(&mut self, cmd: &Command, ctx: &mut ExecContext) -> ShellResult<i32> {
        // Leading-word alias substitution happens on the unexpanded
        // command word, so a name produced by variable expansion is
        // never taken as an alias
        let alias_value = cmd
            .name
            .as_literal()
            .and_then(|lit| self.aliases.get(lit).cloned());

        let (name, mut args) = match alias_value {
            Some(alias_value) => {
                let mut parts = alias_value.split_whitespace().map(str::to_string);
                match parts.next() {
                    Some(alias_name) => (alias_name, parts.collect()),
                    None => (self.expand_word(&cmd.name, ctx).await?, Vec::new()),
                }
            }
            None => (self.expand_word(&cmd.name, ctx).await?, Vec::new()),
        };

        for arg in &cmd.args {
            let expanded = self.expand_word(arg, ctx).await?;
            let glob_expanded = self.expand_glob(&expanded, arg);
            args.extend(glob_expanded);
        }

        // Stdin redirection first: a missing input file fails the
        // command before it runs
        for redir in &cmd.redirections {
            if redir.kind == RedirectKind::StdinRead {
                let target = self.expand_redirect_target(redir, ctx).await?;
                let path = self.vfs.resolve(&target);
                match self.vfs.read_file(&path) {
                    Ok(data) => ctx.stdin = Some(data.to_vec()),
                    Err(e) => {
                        ctx.write_err(&format!("sandsh: {}", e));
                        return Ok(1);
                    }
                }
            }
        }

        // Output redirections
        let mut stdout_redir: Option<(String, FileWriteMode)> = None;
        let mut stderr_redir: Option<(String, FileWriteMode)> = None;
        let mut merge_stderr = false;

        for redir in &cmd.redirections {
            match redir.kind {
                RedirectKind::StdinRead => {}
                RedirectKind::StderrToStdout => merge_stderr = true,
                kind => {
                    let target = self.expand_redirect_target(redir, ctx).await?;
                    let path = self.vfs.resolve(&target);
                    match kind {
                        RedirectKind::StdoutWrite => {
                            stdout_redir = Some((path, FileWriteMode::Write));
                        }
                        RedirectKind::StdoutAppend => {
                            stdout_redir = Some((path, FileWriteMode::Append));
                        }
                        RedirectKind::StderrWrite => {
                            stderr_redir = Some((path, FileWriteMode::Write));
                        }
                        RedirectKind::StderrAppend => {
                            stderr_redir = Some((path, FileWriteMode::Append));
                        }
                        RedirectKind::BothWrite => {
                            stdout_redir = Some((path.clone(), FileWriteMode::Write));
                            stderr_redir = Some((path, FileWriteMode::Write));
                        }
                        _ => {}
                    }
                }
            }
        }

        let saved_stdout = stdout_redir.map(|(path, mode)| {
            std::mem::replace(
                &mut ctx.stdout,
                Output::File {
                    vfs: self.vfs.clone(),
                    path,
                    buffer: Vec::new(),
                    mode,
                },
            )
        });

        let saved_stderr = stderr_redir.map(|(path, mode)| {
            std::mem::replace(
                &mut ctx.stderr,
                Output::File {
                    vfs: self.vfs.clone(),
                    path,
                    buffer: Vec::new(),
                    mode,
                },
            )
        });

        let saved_merge = ctx.merge_stderr;
        if merge_stderr {
            ctx.merge_stderr = true;
        }

        let result = self.dispatch_command(&name, &args, ctx).await;

        ctx.merge_stderr = saved_merge;

        // Flush and restore, even when the command failed: output
        // produced before the failure still lands in the file
        if let Some(saved) = saved_stderr {
            ctx.stderr.flush().map_err(ShellError::Io)?;
            ctx.stderr = saved;
        }
        if let Some(saved) = saved_stdout {
            ctx.stdout.flush().map_err(ShellError::Io)?;
            ctx.stdout = saved;
        }

        if let Ok(code) = &result {
            self.last_exit_code = *code;
        }

        result
    }

    async fn expand_redirect_target(
        &mut self,
        redir: &Redirection,
        ctx: &mut ExecContext,
    ) -> ShellResult<String> {
        match &redir.target {
            Some(word) => self.expand_word(word, ctx).await,
            None => Err(ShellError::Runtime(
                "redirection missing target".to_string(),
            )),
        }
    }

    fn show_help_if_requested(
        name: &str,
        args: &[String],
        ctx: &mut ExecContext,
    ) -> Option<ShellResult<i32>> {
        if wants_help(args) {
            if let Some(cmd_help) = get_help(name) {
                let _ = ctx.stdout.write(format_help(cmd_help).as_bytes());
                return Some(Ok(0));
            }
        }
        None
    }

    /// Resolve a command name and run it.
    ///
    /// Lookup order: user functions, builtins, host-registered
    /// builtins, language runtimes, executable files in the sandbox.
    /// An unresolved name prints `name: command not found` and yields
    /// exit code 127.
    ///
    /// Boxed because `xargs` re-enters dispatch: the future must be
    /// type-erased to keep its size and auto traits well-defined.
    pub(crate) fn dispatch_command<'a>(
        &'a mut self,
        name: &'a str,
        args: &'a [String],
        ctx: &'a mut ExecContext,
    ) -> Pin<Box<dyn Future<Output = ShellResult<i32>> + Send + 'a>> {
        Box::pin(self.resolve_and_run(name, args, ctx))
    }

    async fn resolve_and_run(
        &mut self,
        name: &str,
        args: &[String],
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        tracing::trace!(command = %name, argc = args.len(), "dispatching command");

        if let Some(result) = Self::show_help_if_requested(name, args, ctx) {
            return result;
        }

        if self.functions.contains_key(name) {
            return self.call_function(name, args, ctx).await;
        }

        if let Some(result) = self.try_execute_text_builtin(name, args, ctx).await {
            return result;
        }
        if let Some(result) = self.try_execute_fs_builtin(name, args, ctx).await {
            return result;
        }
        if let Some(result) = self.try_execute_shell_builtin(name, args, ctx).await {
            return result;
        }

        if let Some(handler) = self.custom_builtins.get(name).cloned() {
            return handler(args, self);
        }

        if self.runtimes.contains_key(name) {
            return self.run_runtime_command(name, args, ctx).await;
        }

        // Executable file in the sandbox
        let path = self.vfs.resolve(name);
        if self.vfs.stat(&path).map(|s| !s.is_dir()).unwrap_or(false) {
            return self.run_script_file(&path, args, ctx).await;
        }

        tracing::debug!(command = %name, "command not found");
        ctx.write_err(&format!("{}: command not found", name));
        Ok(127)
    }

    /// Call a user-defined function with fresh locals and its own
    /// positional parameters. Output sinks are inherited.
    async fn call_function(
        &mut self,
        name: &str,
        args: &[String],
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        let body_str = match self.get_function(name) {
            Some(s) => s.to_string(),
            None => return Ok(127),
        };
        let body: Vec<Statement> = serde_json::from_str(&body_str)
            .map_err(|e| ShellError::Runtime(format!("Failed to parse function: {}", e)))?;

        let inherited_stdout = std::mem::replace(&mut ctx.stdout, Output::Stdout);
        let inherited_stderr = std::mem::replace(&mut ctx.stderr, Output::Stdout);
        let mut func_ctx = ExecContext {
            locals: HashMap::new(),
            positional: args.to_vec(),
            stdin: ctx.stdin.take(),
            stdout: inherited_stdout,
            stderr: inherited_stderr,
            merge_stderr: ctx.merge_stderr,
            should_break: false,
            should_continue: false,
            return_value: None,
        };

        // Hand the sinks back on every path: output written before an
        // `exit` (or any error) must survive the unwind
        let mut result = Ok(0);
        for stmt in &body {
            match self.execute_statement_boxed(stmt, &mut func_ctx).await {
                Ok(code) => result = Ok(code),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
            if let Some(code) = func_ctx.return_value {
                result = Ok(code);
                break;
            }
        }

        ctx.stdout = func_ctx.stdout;
        ctx.stderr = func_ctx.stderr;
        result
    }

    /// Run code through a registered language runtime.
    ///
    /// `name script.py [args...]` reads the script from the sandbox;
    /// `name -c code` runs inline code; with piped stdin the input
    /// becomes the program. An interactive session (bare `name` at a
    /// terminal) is handled by the REPL front-end, not here.
    async fn run_runtime_command(
        &mut self,
        name: &str,
        args: &[String],
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        let runtime = match self.runtime(name) {
            Some(rt) => rt,
            None => return Ok(127),
        };

        let code = if args.first().map(String::as_str) == Some("-c") {
            if args.len() < 2 {
                ctx.write_err(&format!("{}: -c requires an argument", name));
                return Ok(2);
            }
            args[1..].join(" ")
        } else if let Some(script_path) = args.first() {
            let path = self.vfs.resolve(script_path);
            match self.vfs.read_to_string(&path) {
                Ok(code) => code,
                Err(e) => {
                    ctx.write_err(&format!("{}: {}", name, e));
                    return Ok(1);
                }
            }
        } else if let Some(stdin) = ctx.stdin.take() {
            String::from_utf8_lossy(&stdin).into_owned()
        } else {
            ctx.write_err(&format!("{}: no input (give a script file or -c code)", name));
            return Ok(2);
        };

        let output = runtime.execute(&code).await;
        if !output.stdout.is_empty() {
            ctx.stdout.write(output.stdout.as_bytes())?;
        }
        if !output.stderr.is_empty() {
            ctx.write_err(output.stderr.trim_end_matches('\n'));
        }
        Ok(output.exit_code)
    }

    /// Execute a file from the sandbox as a script. A shebang line
    /// routes to a registered runtime; otherwise the file is run as a
    /// shell script with its own positional parameters.
    async fn run_script_file(
        &mut self,
        path: &str,
        args: &[String],
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        let content = match self.vfs.read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                ctx.write_err(&format!("sandsh: {}", e));
                return Ok(1);
            }
        };

        if let Some(rest) = content.strip_prefix("#!") {
            let interp_line = rest.lines().next().unwrap_or("").trim();
            let interp = interp_line
                .split_whitespace()
                .next()
                .and_then(|p| p.rsplit('/').next())
                .unwrap_or("");
            if let Some(runtime) = self.runtime(interp) {
                tracing::debug!(path = %path, runtime = %interp, "running script via runtime");
                let body = content
                    .split_once('\n')
                    .map(|(_, rest)| rest.to_string())
                    .unwrap_or_default();
                let output = runtime.execute(&body).await;
                if !output.stdout.is_empty() {
                    ctx.stdout.write(output.stdout.as_bytes())?;
                }
                if !output.stderr.is_empty() {
                    ctx.write_err(output.stderr.trim_end_matches('\n'));
                }
                return Ok(output.exit_code);
            }
        }

        let script = crate::parser::parse(&crate::brace::expand_braces(&content))
            .map_err(|errs| {
                let msg = errs
                    .into_iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                ShellError::Parse(msg)
            })?;

        let inherited_stdout = std::mem::replace(&mut ctx.stdout, Output::Stdout);
        let inherited_stderr = std::mem::replace(&mut ctx.stderr, Output::Stdout);
        let mut script_ctx = ExecContext {
            locals: HashMap::new(),
            positional: args.to_vec(),
            stdin: ctx.stdin.take(),
            stdout: inherited_stdout,
            stderr: inherited_stderr,
            merge_stderr: ctx.merge_stderr,
            should_break: false,
            should_continue: false,
            return_value: None,
        };

        let result = self.execute_script_with(&script, &mut script_ctx).await;
        let code = match result {
            Ok(code) => script_ctx.return_value.unwrap_or(code),
            Err(e) => {
                ctx.stdout = script_ctx.stdout;
                ctx.stderr = script_ctx.stderr;
                return Err(e);
            }
        };
        ctx.stdout = script_ctx.stdout;
        ctx.stderr = script_ctx.stderr;
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_exits_zero() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("echo hello").await;
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout, "hello\n");
    }

    #[tokio::test]
    async fn variable_assignment() {
        let mut shell = Shell::new();
        shell.execute_capture("x=5").await;
        assert_eq!(shell.get_var("x"), Some("5"));
    }

    #[tokio::test]
    async fn command_not_found_is_127() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("no_such_cmd").await;
        assert_eq!(out.exit_code, 127);
        assert!(out.stderr.contains("command not found"));
    }

    #[tokio::test]
    async fn pipeline_stages_share_buffer() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("echo hello | wc -c").await;
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout.trim(), "6");
    }

    #[tokio::test]
    async fn and_or_short_circuit() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("false && echo yes || echo no").await;
        assert_eq!(out.stdout, "no\n");
    }

    #[tokio::test]
    async fn redirect_write_and_read_back() {
        let mut shell = Shell::new();
        shell.execute_capture("echo data > /f.txt").await;
        let out = shell.execute_capture("cat /f.txt").await;
        assert_eq!(out.stdout, "data\n");
    }

    #[tokio::test]
    async fn redirect_append() {
        let mut shell = Shell::new();
        shell.execute_capture("echo one > /f.txt").await;
        shell.execute_capture("echo two >> /f.txt").await;
        let out = shell.execute_capture("cat /f.txt").await;
        assert_eq!(out.stdout, "one\ntwo\n");
    }

    #[tokio::test]
    async fn missing_stdin_file_fails_before_running() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("cat < /missing.txt").await;
        assert_eq!(out.exit_code, 1);
        assert!(out.stderr.contains("No such file"));
    }

    #[tokio::test]
    async fn merge_stderr_into_stdout() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("no_such_cmd 2>&1").await;
        assert!(out.stdout.contains("command not found"));
        assert!(out.stderr.is_empty());
    }

    #[tokio::test]
    async fn function_definition_and_call() {
        let mut shell = Shell::new();
        shell.execute_capture("greet() { echo hello $1; }").await;
        let out = shell.execute_capture("greet world").await;
        assert_eq!(out.stdout, "hello world\n");
    }

    #[tokio::test]
    async fn function_output_before_exit_is_kept() {
        let mut shell = Shell::new();
        shell.execute_capture("f() { echo partial; exit 4; }").await;
        let out = shell.execute_capture("f").await;
        assert_eq!(out.exit_code, 4);
        assert_eq!(out.stdout, "partial\n");
    }

    #[tokio::test]
    async fn script_output_before_exit_is_kept() {
        let mut shell = Shell::new();
        shell
            .execute_capture("printf 'echo partial\\nexit 5\\n' > /s.sh")
            .await;
        let out = shell.execute_capture("/s.sh").await;
        assert_eq!(out.exit_code, 5);
        assert_eq!(out.stdout, "partial\n");
    }

    #[tokio::test]
    async fn function_return_code() {
        let mut shell = Shell::new();
        shell.execute_capture("f() { return 3; }").await;
        let out = shell.execute_capture("f").await;
        assert_eq!(out.exit_code, 3);
    }

    #[tokio::test]
    async fn script_file_execution() {
        let mut shell = Shell::new();
        shell
            .execute_capture("echo 'echo from script' > /run.sh")
            .await;
        let out = shell.execute_capture("/run.sh").await;
        assert_eq!(out.stdout, "from script\n");
    }
}
