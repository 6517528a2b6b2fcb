//! Control flow: if/for/while/until/case and the `test` builtin

use super::ExecContext;
use crate::ast::*;
use crate::error::ShellResult;
use crate::shell::Shell;

/// Safety valve for non-terminating scripts inside an embedding host.
const LOOP_ITERATION_LIMIT: usize = 10_000;

impl Shell {
    pub(crate) async fn execute_test(
        &self,
        args: &[String],
        _ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        let args: Vec<&str> = args
            .iter()
            .map(|s| s.as_str())
            .filter(|s| *s != "]")
            .collect();

        if args.is_empty() {
            return Ok(1);
        }

        // Handle ! negation
        let (negate, args) = if args.first() == Some(&"!") {
            (true, &args[1..])
        } else {
            (false, args.as_slice())
        };

        if args.is_empty() {
            return Ok(if negate { 0 } else { 1 });
        }

        let result = match args {
            [s1, "=", s2] | [s1, "==", s2] => s1 == s2,
            [s1, "!=", s2] => s1 != s2,
            [n1, "-eq", n2] => parse_num(n1) == parse_num(n2),
            [n1, "-ne", n2] => parse_num(n1) != parse_num(n2),
            [n1, "-lt", n2] => parse_num(n1) < parse_num(n2),
            [n1, "-le", n2] => parse_num(n1) <= parse_num(n2),
            [n1, "-gt", n2] => parse_num(n1) > parse_num(n2),
            [n1, "-ge", n2] => parse_num(n1) >= parse_num(n2),
            ["-n", s] => !s.is_empty(),
            ["-z", s] => s.is_empty(),
            ["-e", path] | ["-f", path] | ["-d", path] | ["-s", path] => {
                let op = args[0];
                let full_path = self.vfs.resolve(path);
                match self.vfs.stat(&full_path) {
                    Ok(info) => match op {
                        "-e" => true,
                        "-f" => !info.is_dir(),
                        "-d" => info.is_dir(),
                        "-s" => info.size > 0,
                        _ => false,
                    },
                    Err(_) => false,
                }
            }
            [s] => !s.is_empty(),
            _ => false,
        };

        let result = if negate { !result } else { result };
        Ok(if result { 0 } else { 1 })
    }

    pub(crate) async fn execute_if(
        &mut self,
        if_stmt: &IfStatement,
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        let cond_result = self.execute_pipeline(&if_stmt.condition, ctx).await?;

        let body = if cond_result == 0 {
            &if_stmt.then_body
        } else {
            match &if_stmt.else_body {
                Some(else_body) => else_body,
                None => return Ok(0),
            }
        };

        let mut result = 0;
        for stmt in body {
            result = self.execute_statement_boxed(stmt, ctx).await?;
            if ctx.should_break || ctx.should_continue || ctx.return_value.is_some() {
                return Ok(result);
            }
        }
        Ok(result)
    }

    pub(crate) async fn execute_for(
        &mut self,
        for_loop: &ForLoop,
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        let mut result = 0;

        // Items expand, then split on whitespace, then glob
        let mut all_items = Vec::new();
        for item in &for_loop.items {
            let expanded = self.expand_word(item, ctx).await?;
            for part in expanded.split_whitespace() {
                all_items.extend(self.expand_glob(part, item));
            }
        }

        // The loop variable is a local of the enclosing scope, not an
        // exported variable
        for value in all_items {
            ctx.locals.insert(for_loop.variable.clone(), value);

            for stmt in &for_loop.body {
                result = self.execute_statement_boxed(stmt, ctx).await?;

                if ctx.should_break {
                    ctx.should_break = false;
                    return Ok(result);
                }
                if ctx.should_continue {
                    ctx.should_continue = false;
                    break;
                }
                if ctx.return_value.is_some() {
                    return Ok(result);
                }
            }
        }

        Ok(result)
    }

    pub(crate) async fn execute_while(
        &mut self,
        while_loop: &WhileLoop,
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        let mut result = 0;
        let mut iterations = 0;

        loop {
            if iterations >= LOOP_ITERATION_LIMIT {
                break;
            }
            iterations += 1;

            let cond_result = self.execute_pipeline(&while_loop.condition, ctx).await?;
            if cond_result != 0 {
                break;
            }

            for stmt in &while_loop.body {
                result = self.execute_statement_boxed(stmt, ctx).await?;

                if ctx.should_break {
                    ctx.should_break = false;
                    return Ok(result);
                }
                if ctx.should_continue {
                    ctx.should_continue = false;
                    break;
                }
                if ctx.return_value.is_some() {
                    return Ok(result);
                }
            }
        }

        Ok(result)
    }

    pub(crate) async fn execute_until(
        &mut self,
        until_loop: &UntilLoop,
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        let mut result = 0;
        let mut iterations = 0;

        loop {
            if iterations >= LOOP_ITERATION_LIMIT {
                break;
            }
            iterations += 1;

            let cond_result = self.execute_pipeline(&until_loop.condition, ctx).await?;
            if cond_result == 0 {
                break;
            }

            for stmt in &until_loop.body {
                result = self.execute_statement_boxed(stmt, ctx).await?;

                if ctx.should_break {
                    ctx.should_break = false;
                    return Ok(result);
                }
                if ctx.should_continue {
                    ctx.should_continue = false;
                    break;
                }
                if ctx.return_value.is_some() {
                    return Ok(result);
                }
            }
        }

        Ok(result)
    }

    /// First matching arm wins. Patterns compare by exact string
    /// equality; a literal `*` pattern matches anything. No match
    /// leaves exit code 0.
    pub(crate) async fn execute_case(
        &mut self,
        case_stmt: &CaseStatement,
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        let word_value = self.expand_word(&case_stmt.word, ctx).await?;

        for arm in &case_stmt.arms {
            for pattern in &arm.patterns {
                let pattern_value = self.expand_word(pattern, ctx).await?;
                if pattern_value == "*" || pattern_value == word_value {
                    let mut last = 0;
                    for stmt in &arm.body {
                        last = self.execute_statement_boxed(stmt, ctx).await?;
                        if ctx.should_break || ctx.should_continue || ctx.return_value.is_some() {
                            return Ok(last);
                        }
                    }
                    return Ok(last);
                }
            }
        }

        Ok(0)
    }
}

fn parse_num(s: &str) -> i64 {
    s.parse().unwrap_or(0)
}
