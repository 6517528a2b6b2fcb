//! Shell-level builtins: environment, aliases, help, networking

use super::ExecContext;
use crate::error::{ShellError, ShellResult};
use crate::help;
use crate::shell::Shell;

const BUILTIN_NAMES: &[&str] = &[
    "alias", "basename", "cat", "cd", "clear", "cp", "curl", "cut", "date", "dirname", "echo",
    "env", "exit", "export", "false", "file", "grep", "head", "help", "history", "local",
    "ls", "mkdir", "mv", "printf", "pwd", "read", "rm", "seq", "set", "sleep", "sort", "source",
    "stat", "tail", "tar", "tee", "test", "touch", "tr", "true", "type", "unalias", "uniq",
    "unset", "wc", "wget", "which", "xargs", "[",
];

impl Shell {
    pub(crate) async fn try_execute_shell_builtin(
        &mut self,
        name: &str,
        args: &[String],
        ctx: &mut ExecContext,
    ) -> Option<ShellResult<i32>> {
        match name {
            "true" | "false" | "exit" | "export" | "set" | "unset" | "env" | "local"
            | "alias" | "unalias" | "source" | "." | "sleep" | "help" | "clear" | "history"
            | "which" | "type" | "xargs" | "curl" | "wget" | "[" | "test" => {
                Some(self.dispatch_shell_builtin(name, args, ctx).await)
            }
            _ => None,
        }
    }

    async fn dispatch_shell_builtin(
        &mut self,
        name: &str,
        args: &[String],
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        match name {
            "true" => Ok(0),
            "false" => Ok(1),
            "exit" => self.cmd_exit(args),
            "export" => self.cmd_export(args),
            "set" | "env" => self.cmd_env(ctx),
            "unset" => self.cmd_unset(args),
            "local" => self.cmd_local(args, ctx),
            "alias" => self.cmd_alias(args, ctx),
            "unalias" => self.cmd_unalias(args),
            "source" | "." => self.cmd_source(args, ctx).await,
            "sleep" => self.cmd_sleep(args).await,
            "help" => self.cmd_help(args, ctx),
            "clear" => self.cmd_clear(ctx),
            "history" => self.cmd_history(ctx),
            "which" => self.cmd_which(args, ctx),
            "type" => self.cmd_type(args, ctx),
            "xargs" => self.cmd_xargs(args, ctx).await,
            "curl" => self.cmd_curl(args, ctx).await,
            "wget" => self.cmd_wget(args, ctx).await,
            "[" | "test" => self.execute_test(args, ctx).await,
            _ => unreachable!(),
        }
    }

    fn cmd_exit(&mut self, args: &[String]) -> ShellResult<i32> {
        let code = args
            .first()
            .and_then(|s| s.parse::<i32>().ok())
            .unwrap_or(0);
        Err(ShellError::Exit(code))
    }

    fn cmd_export(&mut self, args: &[String]) -> ShellResult<i32> {
        let mut i = 0;
        while i < args.len() {
            // "NAME = VALUE" arrives as 3 tokens when the lexer splits NAME=VALUE
            if i + 2 < args.len() && args[i + 1] == "=" {
                let name = args[i].clone();
                let value = args[i + 2].clone();
                self.set_var(&name, &value);
                i += 3;
            } else if let Some((name, value)) = args[i].split_once('=') {
                let name = name.to_string();
                let value = value.to_string();
                self.set_var(&name, &value);
                i += 1;
            } else {
                // export without value leaves the variable as-is
                i += 1;
            }
        }
        Ok(0)
    }

    fn cmd_env(&mut self, ctx: &mut ExecContext) -> ShellResult<i32> {
        let mut vars: Vec<_> = self.env.iter().collect();
        vars.sort_by_key(|(k, _)| k.as_str());
        for (name, value) in vars {
            ctx.stdout
                .writeln(&format!("{}={}", name, value))
                .map_err(ShellError::Io)?;
        }
        Ok(0)
    }

    fn cmd_unset(&mut self, args: &[String]) -> ShellResult<i32> {
        for name in args {
            self.env.remove(name);
        }
        Ok(0)
    }

    fn cmd_local(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let mut i = 0;
        while i < args.len() {
            if i + 2 < args.len() && args[i + 1] == "=" {
                ctx.locals.insert(args[i].clone(), args[i + 2].clone());
                i += 3;
            } else if let Some((name, value)) = args[i].split_once('=') {
                ctx.locals.insert(name.to_string(), value.to_string());
                i += 1;
            } else {
                ctx.locals.insert(args[i].clone(), String::new());
                i += 1;
            }
        }
        Ok(0)
    }

    fn cmd_alias(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        if args.is_empty() {
            let mut aliases: Vec<_> = self.aliases.iter().collect();
            aliases.sort_by_key(|(k, _)| k.as_str());
            for (name, value) in aliases {
                ctx.stdout
                    .writeln(&format!("alias {}='{}'", name, value))
                    .map_err(ShellError::Io)?;
            }
            return Ok(0);
        }

        let mut i = 0;
        while i < args.len() {
            if i + 2 < args.len() && args[i + 1] == "=" {
                let name = args[i].clone();
                let value = args[i + 2]
                    .trim_matches(|c| c == '\'' || c == '"')
                    .to_string();
                self.aliases.insert(name, value);
                i += 3;
            } else if let Some((name, value)) = args[i].split_once('=') {
                let value = value.trim_matches(|c| c == '\'' || c == '"');
                self.aliases.insert(name.to_string(), value.to_string());
                i += 1;
            } else if let Some(value) = self.aliases.get(&args[i]) {
                ctx.stdout
                    .writeln(&format!("alias {}='{}'", &args[i], value))
                    .map_err(ShellError::Io)?;
                i += 1;
            } else {
                i += 1;
            }
        }
        Ok(0)
    }

    fn cmd_unalias(&mut self, args: &[String]) -> ShellResult<i32> {
        for arg in args {
            self.aliases.remove(arg);
        }
        Ok(0)
    }

    /// Runs a script from the VFS in the caller's context, so its output
    /// follows any active redirections and its assignments persist.
    async fn cmd_source(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let path = match args.first() {
            Some(p) => p,
            None => {
                ctx.write_err("source: filename argument required");
                return Ok(1);
            }
        };
        let full_path = self.vfs.resolve(path);
        let content = match self.vfs.read_to_string(&full_path) {
            Ok(s) => s,
            Err(e) => {
                ctx.write_err(&format!("source: {}", e));
                return Ok(1);
            }
        };

        let script = self.parse_input(&content)?;
        let mut last = 0;
        for stmt in &script.statements {
            last = self.execute_statement_boxed(stmt, ctx).await?;
            if ctx.should_break || ctx.should_continue || ctx.return_value.is_some() {
                break;
            }
        }
        Ok(last)
    }

    async fn cmd_sleep(&mut self, args: &[String]) -> ShellResult<i32> {
        let secs = args
            .first()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);
        tokio::time::sleep(tokio::time::Duration::from_secs_f64(secs)).await;
        Ok(0)
    }

    fn cmd_help(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        if let Some(cmd_name) = args.first() {
            if let Some(cmd_help) = help::get_help(cmd_name) {
                ctx.stdout
                    .write(help::format_help(cmd_help).as_bytes())
                    .map_err(ShellError::Io)?;
            } else {
                ctx.write_err(&format!("help: no help for '{}'", cmd_name));
                return Ok(1);
            }
        } else {
            ctx.stdout
                .write(help::format_help_list().as_bytes())
                .map_err(ShellError::Io)?;
        }
        Ok(0)
    }

    fn cmd_clear(&mut self, ctx: &mut ExecContext) -> ShellResult<i32> {
        ctx.stdout
            .write(b"\x1b[2J\x1b[H")
            .map_err(ShellError::Io)?;
        Ok(0)
    }

    fn cmd_history(&mut self, ctx: &mut ExecContext) -> ShellResult<i32> {
        for (idx, entry) in self.history.iter().enumerate() {
            ctx.stdout
                .writeln(&format!("{:>5}  {}", idx + 1, entry))
                .map_err(ShellError::Io)?;
        }
        Ok(0)
    }

    fn cmd_which(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let mut all_found = true;
        for name in args {
            if self.functions.contains_key(name)
                || self.custom_builtins.contains_key(name)
                || self.runtime(name).is_some()
                || BUILTIN_NAMES.contains(&name.as_str())
            {
                ctx.stdout.writeln(name).map_err(ShellError::Io)?;
                continue;
            }
            let full_path = self.vfs.resolve(name);
            if self.vfs.exists(&full_path) {
                ctx.stdout.writeln(&full_path).map_err(ShellError::Io)?;
            } else {
                all_found = false;
            }
        }
        Ok(if all_found { 0 } else { 1 })
    }

    fn cmd_type(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let mut all_found = true;
        for name in args {
            let line = if let Some(value) = self.aliases.get(name) {
                format!("{} is an alias for '{}'", name, value)
            } else if self.functions.contains_key(name) {
                format!("{} is a function", name)
            } else if BUILTIN_NAMES.contains(&name.as_str()) {
                format!("{} is a shell builtin", name)
            } else if self.custom_builtins.contains_key(name) {
                format!("{} is a host builtin", name)
            } else if self.runtime(name).is_some() {
                format!("{} is a language runtime", name)
            } else {
                let full_path = self.vfs.resolve(name);
                if self.vfs.exists(&full_path) {
                    format!("{} is {}", name, full_path)
                } else {
                    ctx.write_err(&format!("type: {}: not found", name));
                    all_found = false;
                    continue;
                }
            };
            ctx.stdout.writeln(&line).map_err(ShellError::Io)?;
        }
        Ok(if all_found { 0 } else { 1 })
    }

    /// Append whitespace-split stdin items to the command and run it once.
    async fn cmd_xargs(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let input = ctx.stdin.take().unwrap_or_default();
        let items: Vec<String> = String::from_utf8_lossy(&input)
            .split_whitespace()
            .map(|s| s.to_string())
            .collect();

        let (name, base_args) = match args.split_first() {
            Some((n, rest)) => (n.clone(), rest.to_vec()),
            None => ("echo".to_string(), Vec::new()),
        };

        let mut combined = base_args;
        combined.extend(items);

        self.dispatch_command(&name, &combined, ctx).await
    }

    async fn cmd_curl(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let mut method = "GET".to_string();
        let mut headers: Vec<(String, String)> = Vec::new();
        let mut body: Option<String> = None;
        let mut output: Option<String> = None;
        let mut url: Option<String> = None;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "-X" | "--request" => {
                    if i + 1 < args.len() {
                        method = args[i + 1].to_uppercase();
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                "-H" | "--header" => {
                    if i + 1 < args.len() {
                        if let Some((k, v)) = args[i + 1].split_once(':') {
                            headers.push((k.trim().to_string(), v.trim().to_string()));
                        }
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                "-d" | "--data" => {
                    if i + 1 < args.len() {
                        body = Some(args[i + 1].clone());
                        if method == "GET" {
                            method = "POST".to_string();
                        }
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                "-o" | "--output" => {
                    if i + 1 < args.len() {
                        output = Some(args[i + 1].clone());
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                "-s" | "--silent" => i += 1,
                s if !s.starts_with('-') => {
                    url = Some(s.to_string());
                    i += 1;
                }
                _ => i += 1,
            }
        }

        let url = match url {
            Some(u) => u,
            None => {
                ctx.write_err("curl: no URL given");
                return Ok(1);
            }
        };

        let client = reqwest::Client::new();
        let mut req = match method.as_str() {
            "GET" => client.get(&url),
            "POST" => client.post(&url),
            "PUT" => client.put(&url),
            "DELETE" => client.delete(&url),
            "PATCH" => client.patch(&url),
            "HEAD" => client.head(&url),
            _ => {
                ctx.write_err(&format!("curl: unknown method: {}", method));
                return Ok(1);
            }
        };
        for (k, v) in headers {
            req = req.header(&k, &v);
        }
        if let Some(b) = body {
            req = req.body(b);
        }

        let bytes = match req.send().await {
            Ok(resp) => match resp.bytes().await {
                Ok(b) => b,
                Err(e) => {
                    ctx.write_err(&format!("curl: {}", e));
                    return Ok(1);
                }
            },
            Err(e) => {
                ctx.write_err(&format!("curl: {}", e));
                return Ok(1);
            }
        };

        match output {
            Some(path) => {
                let full_path = self.vfs.resolve(&path);
                if let Err(e) = self.vfs.write_file(&full_path, &bytes) {
                    ctx.write_err(&format!("curl: {}", e));
                    return Ok(1);
                }
            }
            None => {
                ctx.stdout.write(&bytes).map_err(ShellError::Io)?;
                if !bytes.ends_with(b"\n") {
                    ctx.stdout.write(b"\n").map_err(ShellError::Io)?;
                }
            }
        }
        Ok(0)
    }

    async fn cmd_wget(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let mut output: Option<String> = None;
        let mut url: Option<String> = None;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "-O" | "--output-document" => {
                    if i + 1 < args.len() {
                        output = Some(args[i + 1].clone());
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                "-q" | "--quiet" => i += 1,
                s if !s.starts_with('-') => {
                    url = Some(s.to_string());
                    i += 1;
                }
                _ => i += 1,
            }
        }

        let url = match url {
            Some(u) => u,
            None => {
                ctx.write_err("wget: no URL given");
                return Ok(1);
            }
        };

        // Default name comes from the last URL path segment
        let target = output.unwrap_or_else(|| {
            url.trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty() && !s.contains(':'))
                .unwrap_or("index.html")
                .to_string()
        });

        let bytes = match reqwest::get(&url).await {
            Ok(resp) => match resp.bytes().await {
                Ok(b) => b,
                Err(e) => {
                    ctx.write_err(&format!("wget: {}", e));
                    return Ok(1);
                }
            },
            Err(e) => {
                ctx.write_err(&format!("wget: {}", e));
                return Ok(1);
            }
        };

        let full_path = self.vfs.resolve(&target);
        if let Err(e) = self.vfs.write_file(&full_path, &bytes) {
            ctx.write_err(&format!("wget: {}", e));
            return Ok(1);
        }
        Ok(0)
    }
}
