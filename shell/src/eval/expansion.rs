//! Word expansion: variables, parameters, command substitution, globs

use super::utils::{contains_glob_chars, match_glob_pattern};
use super::{ExecContext, Output};
use crate::ast::*;
use crate::error::{ShellError, ShellResult};
use crate::shell::Shell;

impl Shell {
    pub(crate) async fn expand_word(
        &mut self,
        word: &Word,
        ctx: &mut ExecContext,
    ) -> ShellResult<String> {
        let mut result = String::new();

        for part in &word.parts {
            match part {
                WordPart::Literal(s) => {
                    let expanded = self.expand_variables_in_string(s, ctx).await?;
                    result.push_str(&expanded);
                }
                WordPart::SingleQuoted(s) => {
                    result.push_str(s);
                }
                WordPart::Variable(name) => {
                    // The lexer hands over everything after '$' up to the
                    // next word boundary; only the identifier prefix names
                    // the variable ("$HOME/docs" looks up HOME)
                    let (ident, rest) = split_var_name(name);
                    result.push_str(&self.get_variable_value(ident, ctx));
                    result.push_str(rest);
                }
                WordPart::BracedVariable(content) => {
                    let value = Box::pin(self.expand_braced_param(content, ctx)).await?;
                    result.push_str(&value);
                }
                WordPart::Arithmetic(expr) => {
                    let value = self.evaluate_arithmetic(expr, ctx);
                    result.push_str(&value.to_string());
                }
                WordPart::CommandSub(cmd) => {
                    let output = self.execute_command_sub(cmd, ctx).await?;
                    result.push_str(&output);
                }
            }
        }

        Ok(result)
    }

    /// Expand `$var`, `${...}`, `$(...)` and `$((...))` occurrences in
    /// text that reached us as a literal (e.g. the inside of double
    /// quotes).
    async fn expand_variables_in_string(
        &mut self,
        s: &str,
        ctx: &mut ExecContext,
    ) -> ShellResult<String> {
        let mut result = String::new();
        let mut chars = s.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('(') => {
                    chars.next();
                    if chars.peek() == Some(&'(') {
                        chars.next();
                        let expr = Self::collect_balanced_parens(&mut chars, 2);
                        let value = self.evaluate_arithmetic(&expr, ctx);
                        result.push_str(&value.to_string());
                    } else {
                        let cmd = Self::collect_balanced_parens(&mut chars, 1);
                        let output = self.execute_command_sub(&cmd, ctx).await?;
                        result.push_str(&output);
                    }
                }
                Some('{') => {
                    chars.next();
                    let mut content = String::new();
                    let mut depth = 1;
                    while let Some(&c) = chars.peek() {
                        if c == '{' {
                            depth += 1;
                        } else if c == '}' {
                            depth -= 1;
                            if depth == 0 {
                                chars.next();
                                break;
                            }
                        }
                        content.push(c);
                        chars.next();
                    }
                    let expanded = Box::pin(self.expand_braced_param(&content, ctx)).await?;
                    result.push_str(&expanded);
                }
                Some(&c) if matches!(c, '?' | '#' | '@' | '*' | '$') => {
                    chars.next();
                    result.push_str(&self.get_variable_value(&c.to_string(), ctx));
                }
                Some(&c) if c.is_ascii_digit() => {
                    chars.next();
                    result.push_str(&self.get_variable_value(&c.to_string(), ctx));
                }
                Some(&c) if c.is_alphabetic() || c == '_' => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if c.is_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    result.push_str(&self.get_variable_value(&name, ctx));
                }
                _ => result.push('$'),
            }
        }

        Ok(result)
    }

    /// Expand the body of a `${...}` parameter expansion.
    async fn expand_braced_param(
        &mut self,
        content: &str,
        ctx: &mut ExecContext,
    ) -> ShellResult<String> {
        // ${#var} -- string length
        if let Some(var_name) = content.strip_prefix('#') {
            if !var_name.is_empty() {
                let value = self.get_variable_value(var_name, ctx);
                return Ok(value.chars().count().to_string());
            }
        }

        // Two-char operators checked before their single-char prefixes
        let operators = [":-", "-", ":=", "=", ":+", "+", "##", "#", "%%", "%"];
        for op in &operators {
            if let Some(pos) = content.find(op) {
                let var_name = &content[..pos];
                let operand = &content[pos + op.len()..];

                if var_name.is_empty() {
                    continue;
                }

                let value = self.get_variable_value(var_name, ctx);
                let is_set = !value.is_empty() || self.has_variable(var_name, ctx);

                match *op {
                    ":-" => {
                        // use operand if var is unset or empty
                        return Ok(if value.is_empty() {
                            self.expand_variables_in_string(operand, ctx).await?
                        } else {
                            value
                        });
                    }
                    "-" => {
                        // use operand if var is unset
                        return Ok(if !is_set {
                            self.expand_variables_in_string(operand, ctx).await?
                        } else {
                            value
                        });
                    }
                    ":=" => {
                        // assign operand if var is unset or empty
                        if value.is_empty() {
                            let default = self.expand_variables_in_string(operand, ctx).await?;
                            self.assign_in_scope(var_name, &default, ctx);
                            return Ok(default);
                        }
                        return Ok(value);
                    }
                    "=" => {
                        // assign operand if var is unset
                        if !is_set {
                            let default = self.expand_variables_in_string(operand, ctx).await?;
                            self.assign_in_scope(var_name, &default, ctx);
                            return Ok(default);
                        }
                        return Ok(value);
                    }
                    ":+" => {
                        // use operand if var is set and non-empty
                        return Ok(if !value.is_empty() {
                            self.expand_variables_in_string(operand, ctx).await?
                        } else {
                            String::new()
                        });
                    }
                    "+" => {
                        // use operand if var is set
                        return Ok(if is_set {
                            self.expand_variables_in_string(operand, ctx).await?
                        } else {
                            String::new()
                        });
                    }
                    "##" => return Ok(Self::remove_prefix(&value, operand, true)),
                    "#" => return Ok(Self::remove_prefix(&value, operand, false)),
                    "%%" => return Ok(Self::remove_suffix(&value, operand, true)),
                    "%" => return Ok(Self::remove_suffix(&value, operand, false)),
                    _ => unreachable!(),
                }
            }
        }

        // No operator -- simple variable reference
        Ok(self.get_variable_value(content, ctx))
    }

    /// Assign to the scope a lookup would resolve: an existing local
    /// shadows the exported env, so the assignment must land there.
    fn assign_in_scope(&mut self, name: &str, value: &str, ctx: &mut ExecContext) {
        if ctx.locals.contains_key(name) {
            ctx.locals.insert(name.to_string(), value.to_string());
        } else {
            self.set_var(name, value);
        }
    }

    fn has_variable(&self, name: &str, ctx: &ExecContext) -> bool {
        match name {
            "?" | "#" | "@" | "*" | "$" | "0" | "PWD" => return true,
            _ => {}
        }
        if let Ok(n) = name.parse::<usize>() {
            return n > 0 && n <= ctx.positional.len();
        }
        ctx.locals.contains_key(name) || self.get_var(name).is_some()
    }

    fn remove_prefix(value: &str, pattern: &str, greedy: bool) -> String {
        let indices: Vec<usize> = value
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(value.len()))
            .collect();
        let try_split = |i: usize| -> Option<String> {
            match_glob_pattern(pattern, &value[..i]).then(|| value[i..].to_string())
        };
        if greedy {
            for &i in indices.iter().rev() {
                if let Some(s) = try_split(i) {
                    return s;
                }
            }
        } else {
            for &i in &indices {
                if let Some(s) = try_split(i) {
                    return s;
                }
            }
        }
        value.to_string()
    }

    fn remove_suffix(value: &str, pattern: &str, greedy: bool) -> String {
        let indices: Vec<usize> = value
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(value.len()))
            .collect();
        let try_split = |i: usize| -> Option<String> {
            match_glob_pattern(pattern, &value[i..]).then(|| value[..i].to_string())
        };
        if greedy {
            for &i in &indices {
                if let Some(s) = try_split(i) {
                    return s;
                }
            }
        } else {
            for &i in indices.iter().rev() {
                if let Some(s) = try_split(i) {
                    return s;
                }
            }
        }
        value.to_string()
    }

    pub(crate) fn collect_balanced_parens(
        chars: &mut std::iter::Peekable<std::str::Chars>,
        initial_depth: usize,
    ) -> String {
        let mut result = String::new();
        let mut depth = initial_depth;

        for c in chars.by_ref() {
            if c == '(' {
                depth += 1;
                result.push(c);
            } else if c == ')' {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                result.push(c);
            } else {
                result.push(c);
            }
        }

        result
    }

    pub(crate) fn get_variable_value(&self, name: &str, ctx: &ExecContext) -> String {
        match name {
            "?" => return self.last_exit_code.to_string(),
            "0" => return "sandsh".to_string(),
            "$" => return self.pid.to_string(),
            "#" => return ctx.positional.len().to_string(),
            "@" | "*" => return ctx.positional.join(" "),
            "PWD" => return self.vfs.cwd(),
            _ => {}
        }

        if let Ok(n) = name.parse::<usize>() {
            if n > 0 && n <= ctx.positional.len() {
                return ctx.positional[n - 1].clone();
            }
            return String::new();
        }

        if let Some(value) = ctx.locals.get(name) {
            return value.clone();
        }

        if let Some(value) = self.get_var(name) {
            return value.to_string();
        }

        // Unset variables expand to empty; the host process
        // environment is never consulted
        String::new()
    }

    /// Run a command substitution: evaluate the inner script with
    /// stdout captured, then strip trailing newlines.
    pub(crate) async fn execute_command_sub(
        &mut self,
        cmd: &str,
        ctx: &mut ExecContext,
    ) -> ShellResult<String> {
        let expanded = crate::brace::expand_braces(cmd);
        let script = crate::parser::parse(&expanded).map_err(|e| {
            ShellError::Parse(format!("Command substitution parse error: {:?}", e))
        })?;

        let saved_stdout = std::mem::replace(&mut ctx.stdout, Output::Buffer(Vec::new()));

        for stmt in &script.statements {
            let result = self.execute_statement_boxed(stmt, ctx).await;
            if let Err(e) = result {
                ctx.stdout = saved_stdout;
                return Err(e);
            }
        }

        let output = if let Output::Buffer(buf) = std::mem::replace(&mut ctx.stdout, saved_stdout)
        {
            String::from_utf8_lossy(&buf)
                .trim_end_matches('\n')
                .to_string()
        } else {
            String::new()
        };

        Ok(output)
    }

    /// Expand glob patterns against the sandbox filesystem.
    ///
    /// A pattern with no match passes through unchanged; hidden entries
    /// only match patterns whose final component starts with '.'.
    pub(crate) fn expand_glob(&self, pattern: &str, word: &Word) -> Vec<String> {
        if !contains_glob_chars(pattern) {
            return vec![pattern.to_string()];
        }

        // Quoted glob characters are literal
        if word
            .parts
            .iter()
            .any(|p| matches!(p, WordPart::SingleQuoted(s) if contains_glob_chars(s)))
        {
            return vec![pattern.to_string()];
        }

        let (dir, file_pattern) = if let Some(last_slash) = pattern.rfind('/') {
            let dir_part = &pattern[..=last_slash];
            let file_part = &pattern[last_slash + 1..];

            // Globbing in directory components is not supported
            if contains_glob_chars(dir_part) {
                return vec![pattern.to_string()];
            }

            let dir_str = dir_part.trim_end_matches('/');
            let dir = if dir_str.is_empty() {
                // Pattern anchored at the root, e.g. "/*.log"
                "/".to_string()
            } else {
                self.vfs.resolve(dir_str)
            };
            (dir, file_part.to_string())
        } else {
            (self.vfs.cwd(), pattern.to_string())
        };

        let entries = match self.vfs.readdir(&dir) {
            Ok(e) => e,
            Err(_) => return vec![pattern.to_string()],
        };

        let match_hidden = file_pattern.starts_with('.');
        let mut matches: Vec<String> = entries
            .iter()
            .filter(|name| match_hidden || !name.starts_with('.'))
            .filter(|name| match_glob_pattern(&file_pattern, name))
            .map(|name| {
                if let Some(last_slash) = pattern.rfind('/') {
                    format!("{}{}", &pattern[..=last_slash], name)
                } else {
                    name.clone()
                }
            })
            .collect();

        matches.sort();

        if matches.is_empty() {
            vec![pattern.to_string()]
        } else {
            matches
        }
    }
}

/// Split a raw `$name` reference into the identifier and the literal
/// remainder ("HOME/docs" -> ("HOME", "/docs")).
fn split_var_name(name: &str) -> (&str, &str) {
    let mut first = true;
    for (i, c) in name.char_indices() {
        let is_ident = if first {
            c.is_alphabetic() || c == '_' || matches!(c, '?' | '#' | '@' | '*' | '$') || c.is_ascii_digit()
        } else {
            c.is_alphanumeric() || c == '_'
        };
        if !is_ident {
            return (&name[..i], &name[i..]);
        }
        // Special and positional parameters are single-character names
        if first && (matches!(c, '?' | '#' | '@' | '*' | '$') || c.is_ascii_digit()) {
            return (&name[..c.len_utf8()], &name[c.len_utf8()..]);
        }
        first = false;
    }
    (name, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_names() {
        assert_eq!(split_var_name("HOME"), ("HOME", ""));
        assert_eq!(split_var_name("HOME/docs"), ("HOME", "/docs"));
        assert_eq!(split_var_name("1abc"), ("1", "abc"));
        assert_eq!(split_var_name("?"), ("?", ""));
    }

    #[tokio::test]
    async fn simple_variable() {
        let mut shell = Shell::new();
        shell.set_var("NAME", "world");
        let out = shell.execute_capture("echo hello $NAME").await;
        assert_eq!(out.stdout, "hello world\n");
    }

    #[tokio::test]
    async fn variable_in_double_quotes() {
        let mut shell = Shell::new();
        shell.set_var("NAME", "world");
        let out = shell.execute_capture("echo \"hello $NAME!\"").await;
        assert_eq!(out.stdout, "hello world!\n");
    }

    #[tokio::test]
    async fn single_quotes_suppress_expansion() {
        let mut shell = Shell::new();
        shell.set_var("NAME", "world");
        let out = shell.execute_capture("echo '$NAME'").await;
        assert_eq!(out.stdout, "$NAME\n");
    }

    #[tokio::test]
    async fn unset_variable_is_empty() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("echo \"[$MISSING]\"").await;
        assert_eq!(out.stdout, "[]\n");
    }

    #[tokio::test]
    async fn default_value_operator() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("echo ${MISSING:-fallback}").await;
        assert_eq!(out.stdout, "fallback\n");

        shell.set_var("SET", "real");
        let out = shell.execute_capture("echo ${SET:-fallback}").await;
        assert_eq!(out.stdout, "real\n");
    }

    #[tokio::test]
    async fn assign_default_operator() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("echo ${X:=assigned}").await;
        assert_eq!(out.stdout, "assigned\n");
        assert_eq!(shell.get_var("X"), Some("assigned"));
    }

    #[tokio::test]
    async fn assign_default_lands_in_local_scope() {
        let mut shell = Shell::new();
        shell.execute_capture("export V=outer").await;
        let out = shell
            .execute_capture("f() { local V; echo ${V:=inner}; }; f; echo $V")
            .await;
        assert_eq!(out.stdout, "inner\nouter\n");
        assert_eq!(shell.get_var("V"), Some("outer"));
    }

    #[tokio::test]
    async fn alternative_value_operator() {
        let mut shell = Shell::new();
        shell.set_var("SET", "x");
        let out = shell
            .execute_capture("echo \"[${SET:+alt}][${UNSET:+alt}]\"")
            .await;
        assert_eq!(out.stdout, "[alt][]\n");
    }

    #[tokio::test]
    async fn string_length() {
        let mut shell = Shell::new();
        shell.set_var("WORD", "hello");
        let out = shell.execute_capture("echo ${#WORD}").await;
        assert_eq!(out.stdout, "5\n");
    }

    #[tokio::test]
    async fn suffix_removal() {
        let mut shell = Shell::new();
        shell.set_var("FILE", "archive.tar.gz");
        let out = shell.execute_capture("echo ${FILE%.*}").await;
        assert_eq!(out.stdout, "archive.tar\n");
        let out = shell.execute_capture("echo ${FILE%%.*}").await;
        assert_eq!(out.stdout, "archive\n");
    }

    #[tokio::test]
    async fn prefix_removal() {
        let mut shell = Shell::new();
        shell.set_var("P", "/usr/local/bin");
        let out = shell.execute_capture("echo ${P##*/}").await;
        assert_eq!(out.stdout, "bin\n");
        let out = shell.execute_capture("echo ${P#*/}").await;
        assert_eq!(out.stdout, "usr/local/bin\n");
    }

    #[tokio::test]
    async fn exit_code_variable() {
        let mut shell = Shell::new();
        shell.execute_capture("false").await;
        let out = shell.execute_capture("echo $?").await;
        assert_eq!(out.stdout, "1\n");
    }

    #[tokio::test]
    async fn command_substitution_trims_newline() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("echo \"[$(echo inner)]\"").await;
        assert_eq!(out.stdout, "[inner]\n");
    }

    #[tokio::test]
    async fn backtick_substitution() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("echo `echo old-style`").await;
        assert_eq!(out.stdout, "old-style\n");
    }

    #[tokio::test]
    async fn glob_expansion_sorted() {
        let mut shell = Shell::new();
        shell.execute_capture("touch /b.txt /a.txt /c.log").await;
        let out = shell.execute_capture("echo /*.txt").await;
        assert_eq!(out.stdout, "/a.txt /b.txt\n");
    }

    #[tokio::test]
    async fn glob_no_match_passes_through() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("echo *.zzz").await;
        assert_eq!(out.stdout, "*.zzz\n");
    }

    #[tokio::test]
    async fn glob_skips_hidden_files() {
        let mut shell = Shell::new();
        shell.execute_capture("touch /.hidden /shown").await;
        let out = shell.execute_capture("echo /*").await;
        assert_eq!(out.stdout, "/shown\n");
        let out = shell.execute_capture("echo /.h*").await;
        assert_eq!(out.stdout, "/.hidden\n");
    }

    #[tokio::test]
    async fn pwd_variable_tracks_cwd() {
        let mut shell = Shell::new();
        shell.execute_capture("mkdir /dir && cd /dir").await;
        let out = shell.execute_capture("echo $PWD").await;
        assert_eq!(out.stdout, "/dir\n");
    }
}
