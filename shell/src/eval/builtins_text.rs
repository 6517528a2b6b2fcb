//! Text-processing builtins

use super::utils::interpret_escape_sequences;
use super::ExecContext;
use crate::error::{ShellError, ShellResult};
use crate::shell::Shell;

impl Shell {
    pub(crate) async fn try_execute_text_builtin(
        &mut self,
        name: &str,
        args: &[String],
        ctx: &mut ExecContext,
    ) -> Option<ShellResult<i32>> {
        match name {
            "echo" | "printf" | "cat" | "grep" | "wc" | "head" | "tail" | "sort" | "uniq"
            | "tr" | "cut" | "tee" | "date" | "seq" | "read" => {
                Some(self.dispatch_text_builtin(name, args, ctx).await)
            }
            _ => None,
        }
    }

    async fn dispatch_text_builtin(
        &mut self,
        name: &str,
        args: &[String],
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        match name {
            "echo" => self.cmd_echo(args, ctx),
            "printf" => self.cmd_printf(args, ctx),
            "cat" => self.cmd_cat(args, ctx),
            "grep" => self.cmd_grep(args, ctx),
            "wc" => self.cmd_wc(args, ctx),
            "head" => self.cmd_head(args, ctx),
            "tail" => self.cmd_tail(args, ctx),
            "sort" => self.cmd_sort(args, ctx),
            "uniq" => self.cmd_uniq(args, ctx),
            "tr" => self.cmd_tr(args, ctx),
            "cut" => self.cmd_cut(args, ctx),
            "tee" => self.cmd_tee(args, ctx),
            "date" => self.cmd_date(args, ctx),
            "seq" => self.cmd_seq(args, ctx),
            "read" => self.cmd_read(args, ctx),
            _ => unreachable!(),
        }
    }

    fn cmd_echo(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let mut do_interpret_escapes = false;
        let mut no_newline = false;
        let mut text_args = Vec::new();

        for arg in args {
            match arg.as_str() {
                "-e" if text_args.is_empty() => do_interpret_escapes = true,
                "-n" if text_args.is_empty() => no_newline = true,
                "-en" | "-ne" if text_args.is_empty() => {
                    do_interpret_escapes = true;
                    no_newline = true;
                }
                _ => text_args.push(arg.as_str()),
            }
        }

        let mut output = text_args.join(" ");

        if do_interpret_escapes {
            output = interpret_escape_sequences(&output);
        }

        if no_newline {
            ctx.stdout.write(output.as_bytes()).map_err(ShellError::Io)?;
        } else {
            ctx.stdout.writeln(&output).map_err(ShellError::Io)?;
        }
        Ok(0)
    }

    fn cmd_printf(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        if args.is_empty() {
            return Ok(0);
        }
        let format_str = &args[0];
        let format_args = &args[1..];
        let mut result = String::new();
        let mut chars = format_str.chars().peekable();
        let mut arg_idx = 0;

        while let Some(c) = chars.next() {
            if c == '%' {
                match chars.peek() {
                    Some('s') => {
                        chars.next();
                        if arg_idx < format_args.len() {
                            result.push_str(&format_args[arg_idx]);
                            arg_idx += 1;
                        }
                    }
                    Some('d') => {
                        chars.next();
                        if arg_idx < format_args.len() {
                            let n: i64 = format_args[arg_idx].parse().unwrap_or(0);
                            result.push_str(&n.to_string());
                            arg_idx += 1;
                        }
                    }
                    Some('%') => {
                        chars.next();
                        result.push('%');
                    }
                    _ => result.push('%'),
                }
            } else if c == '\\' {
                match chars.next() {
                    Some('n') => result.push('\n'),
                    Some('t') => result.push('\t'),
                    Some('\\') => result.push('\\'),
                    Some(other) => {
                        result.push('\\');
                        result.push(other);
                    }
                    None => result.push('\\'),
                }
            } else {
                result.push(c);
            }
        }
        ctx.stdout.write(result.as_bytes()).map_err(ShellError::Io)?;
        Ok(0)
    }

    fn cmd_cat(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let paths: Vec<&str> = args
            .iter()
            .filter(|a| *a != "-")
            .map(|s| s.as_str())
            .collect();
        let has_stdin_marker = args.iter().any(|a| a == "-");

        if paths.is_empty() || has_stdin_marker {
            if let Some(input) = ctx.stdin.take() {
                ctx.stdout.write(&input).map_err(ShellError::Io)?;
            }
        }

        for path in paths {
            let full_path = self.vfs.resolve(path);
            match self.vfs.read_file(&full_path) {
                Ok(data) => ctx.stdout.write(&data).map_err(ShellError::Io)?,
                Err(e) => {
                    ctx.write_err(&format!("cat: {}", e));
                    return Ok(1);
                }
            }
        }
        Ok(0)
    }

    fn cmd_grep(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let mut ignore_case = false;
        let mut invert_match = false;
        let mut show_line_numbers = false;
        let mut count_only = false;
        let mut quiet_mode = false;
        let mut use_regex = false;
        let mut pattern: Option<&str> = None;
        let mut paths: Vec<&str> = Vec::new();

        for arg in args {
            match arg.as_str() {
                "-i" => ignore_case = true,
                "-v" => invert_match = true,
                "-n" => show_line_numbers = true,
                "-c" => count_only = true,
                "-q" => quiet_mode = true,
                "-E" => use_regex = true,
                s if s.starts_with('-') && s.len() > 1 => {
                    for c in s[1..].chars() {
                        match c {
                            'i' => ignore_case = true,
                            'v' => invert_match = true,
                            'n' => show_line_numbers = true,
                            'c' => count_only = true,
                            'q' => quiet_mode = true,
                            'E' => use_regex = true,
                            _ => {}
                        }
                    }
                }
                s if pattern.is_none() => pattern = Some(s),
                s => paths.push(s),
            }
        }

        let pattern = match pattern {
            Some(p) => p,
            None => {
                ctx.write_err("grep: missing pattern");
                return Ok(2);
            }
        };

        let regex = if use_regex {
            let src = if ignore_case {
                format!("(?i){}", pattern)
            } else {
                pattern.to_string()
            };
            match regex::Regex::new(&src) {
                Ok(re) => Some(re),
                Err(e) => {
                    ctx.write_err(&format!("grep: invalid pattern: {}", e));
                    return Ok(2);
                }
            }
        } else {
            None
        };

        let input = if !paths.is_empty() {
            let mut combined = String::new();
            for path in &paths {
                let full_path = self.vfs.resolve(path);
                match self.vfs.read_to_string(&full_path) {
                    Ok(s) => combined.push_str(&s),
                    Err(e) => {
                        ctx.write_err(&format!("grep: {}", e));
                        return Ok(2);
                    }
                }
            }
            combined
        } else {
            let data = ctx.stdin.take().unwrap_or_default();
            String::from_utf8_lossy(&data).into_owned()
        };

        let pattern_lower = pattern.to_lowercase();
        let mut match_count = 0;
        let mut found_any = false;

        for (line_num, line) in input.lines().enumerate() {
            let matches = if let Some(re) = &regex {
                re.is_match(line)
            } else if ignore_case {
                line.to_lowercase().contains(&pattern_lower)
            } else {
                line.contains(pattern)
            };

            let final_match = if invert_match { !matches } else { matches };

            if final_match {
                found_any = true;
                match_count += 1;

                if quiet_mode {
                    return Ok(0);
                }

                if !count_only {
                    if show_line_numbers {
                        ctx.stdout
                            .writeln(&format!("{}:{}", line_num + 1, line))
                            .map_err(ShellError::Io)?;
                    } else {
                        ctx.stdout.writeln(line).map_err(ShellError::Io)?;
                    }
                }
            }
        }

        if count_only && !quiet_mode {
            ctx.stdout
                .writeln(&match_count.to_string())
                .map_err(ShellError::Io)?;
        }

        Ok(if found_any { 0 } else { 1 })
    }

    fn cmd_wc(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let count_lines = args.iter().any(|a| a == "-l");
        let count_words = args.iter().any(|a| a == "-w");
        let count_chars = args.iter().any(|a| a == "-c");

        let input = if let Some(path) = args.iter().find(|a| !a.starts_with('-')) {
            let full_path = self.vfs.resolve(path);
            match self.vfs.read_to_string(&full_path) {
                Ok(s) => s,
                Err(e) => {
                    ctx.write_err(&format!("wc: {}", e));
                    return Ok(1);
                }
            }
        } else {
            let data = ctx.stdin.take().unwrap_or_default();
            String::from_utf8_lossy(&data).into_owned()
        };

        if count_lines {
            ctx.stdout
                .writeln(&input.lines().count().to_string())
                .map_err(ShellError::Io)?;
        } else if count_words {
            ctx.stdout
                .writeln(&input.split_whitespace().count().to_string())
                .map_err(ShellError::Io)?;
        } else if count_chars {
            ctx.stdout
                .writeln(&input.len().to_string())
                .map_err(ShellError::Io)?;
        } else {
            let lines = input.lines().count();
            let words = input.split_whitespace().count();
            let chars = input.len();
            ctx.stdout
                .writeln(&format!("{} {} {}", lines, words, chars))
                .map_err(ShellError::Io)?;
        }
        Ok(0)
    }

    fn cmd_head(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let (n, paths) = parse_line_count_args(args);
        let input = self.read_input(&paths, ctx, "head")?;
        let input = match input {
            Some(s) => s,
            None => return Ok(1),
        };

        for (idx, line) in input.lines().enumerate() {
            if idx >= n {
                break;
            }
            ctx.stdout.writeln(line).map_err(ShellError::Io)?;
        }
        Ok(0)
    }

    fn cmd_tail(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let (n, paths) = parse_line_count_args(args);
        let input = self.read_input(&paths, ctx, "tail")?;
        let input = match input {
            Some(s) => s,
            None => return Ok(1),
        };

        let lines: Vec<&str> = input.lines().collect();
        let start = lines.len().saturating_sub(n);
        for line in &lines[start..] {
            ctx.stdout.writeln(line).map_err(ShellError::Io)?;
        }
        Ok(0)
    }

    fn cmd_sort(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let reverse = args.iter().any(|a| a == "-r");
        let numeric = args.iter().any(|a| a == "-n");
        let unique = args.iter().any(|a| a == "-u");
        let paths: Vec<String> = args
            .iter()
            .filter(|a| !a.starts_with('-'))
            .cloned()
            .collect();

        let input = match self.read_input(&paths, ctx, "sort")? {
            Some(s) => s,
            None => return Ok(1),
        };

        let mut lines: Vec<&str> = input.lines().collect();
        if numeric {
            lines.sort_by_key(|l| l.trim().parse::<i64>().unwrap_or(0));
        } else {
            lines.sort();
        }
        if unique {
            lines.dedup();
        }
        if reverse {
            lines.reverse();
        }
        for line in lines {
            ctx.stdout.writeln(line).map_err(ShellError::Io)?;
        }
        Ok(0)
    }

    fn cmd_uniq(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let count = args.iter().any(|a| a == "-c");
        let paths: Vec<String> = args
            .iter()
            .filter(|a| !a.starts_with('-'))
            .cloned()
            .collect();

        let input = match self.read_input(&paths, ctx, "uniq")? {
            Some(s) => s,
            None => return Ok(1),
        };

        let mut prev: Option<&str> = None;
        let mut run = 0usize;
        for line in input.lines().chain(std::iter::once("\0sentinel")) {
            if prev == Some(line) {
                run += 1;
                continue;
            }
            if let Some(p) = prev {
                if count {
                    ctx.stdout
                        .writeln(&format!("{:>7} {}", run, p))
                        .map_err(ShellError::Io)?;
                } else {
                    ctx.stdout.writeln(p).map_err(ShellError::Io)?;
                }
            }
            prev = Some(line);
            run = 1;
        }
        Ok(0)
    }

    fn cmd_tr(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        fn expand_range(s: &str) -> Vec<char> {
            let mut result = Vec::new();
            let chars: Vec<char> = s.chars().collect();
            let mut i = 0;
            while i < chars.len() {
                if i + 2 < chars.len() && chars[i + 1] == '-' {
                    for c in chars[i]..=chars[i + 2] {
                        result.push(c);
                    }
                    i += 3;
                } else {
                    result.push(chars[i]);
                    i += 1;
                }
            }
            result
        }

        let delete_mode = args.first().map(|s| s == "-d").unwrap_or(false);
        let (set1, set2) = if delete_mode {
            match args.get(1) {
                Some(s) => (s, None),
                None => {
                    ctx.write_err("tr: missing operand");
                    return Ok(1);
                }
            }
        } else {
            match (args.first(), args.get(1)) {
                (Some(s1), Some(s2)) => (s1, Some(s2)),
                _ => {
                    ctx.write_err("tr: missing operand");
                    return Ok(1);
                }
            }
        };

        let input = ctx.stdin.take().unwrap_or_default();
        let input_str = String::from_utf8_lossy(&input);

        let output: String = if delete_mode {
            let del_chars = expand_range(set1);
            input_str.chars().filter(|c| !del_chars.contains(c)).collect()
        } else if let Some(s2) = set2 {
            let from = expand_range(set1);
            let to = expand_range(s2);
            input_str
                .chars()
                .map(|c| {
                    from.iter()
                        .position(|&x| x == c)
                        .and_then(|idx| to.get(idx).copied())
                        .unwrap_or(c)
                })
                .collect()
        } else {
            input_str.into_owned()
        };

        ctx.stdout.write(output.as_bytes()).map_err(ShellError::Io)?;
        Ok(0)
    }

    fn cmd_cut(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let mut delimiter = '\t';
        let mut fields: Option<Vec<usize>> = None;
        let mut char_range: Option<(usize, Option<usize>)> = None;
        let mut paths: Vec<String> = Vec::new();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "-d" => {
                    if i + 1 < args.len() {
                        delimiter = args[i + 1].chars().next().unwrap_or('\t');
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                "-f" => {
                    if i + 1 < args.len() {
                        fields = Some(
                            args[i + 1]
                                .split(',')
                                .filter_map(|s| s.parse::<usize>().ok())
                                .collect(),
                        );
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                "-c" => {
                    if i + 1 < args.len() {
                        let range = &args[i + 1];
                        if let Some((start, end)) = range.split_once('-') {
                            let s = start.parse::<usize>().unwrap_or(1);
                            let e = if end.is_empty() {
                                None
                            } else {
                                end.parse::<usize>().ok()
                            };
                            char_range = Some((s, e));
                        } else if let Ok(pos) = range.parse::<usize>() {
                            char_range = Some((pos, Some(pos)));
                        }
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                s if !s.starts_with('-') => {
                    paths.push(s.to_string());
                    i += 1;
                }
                _ => i += 1,
            }
        }

        let input = match self.read_input(&paths, ctx, "cut")? {
            Some(s) => s,
            None => return Ok(1),
        };

        for line in input.lines() {
            let output = if let Some(ref f) = fields {
                let parts: Vec<&str> = line.split(delimiter).collect();
                f.iter()
                    .filter_map(|&i| parts.get(i.saturating_sub(1)).copied())
                    .collect::<Vec<_>>()
                    .join(&delimiter.to_string())
            } else if let Some((start, end)) = char_range {
                let chars_vec: Vec<char> = line.chars().collect();
                let s = start.saturating_sub(1);
                let e = end.unwrap_or(chars_vec.len());
                chars_vec
                    .get(s..e.min(chars_vec.len()))
                    .map(|c| c.iter().collect::<String>())
                    .unwrap_or_default()
            } else {
                line.to_string()
            };
            ctx.stdout.writeln(&output).map_err(ShellError::Io)?;
        }
        Ok(0)
    }

    fn cmd_tee(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let append = args.iter().any(|a| a == "-a");
        let files: Vec<&str> = args
            .iter()
            .filter(|a| !a.starts_with('-'))
            .map(|s| s.as_str())
            .collect();

        let input = ctx.stdin.take().unwrap_or_default();
        ctx.stdout.write(&input).map_err(ShellError::Io)?;

        for file in files {
            let full_path = self.vfs.resolve(file);
            let result = if append {
                self.vfs.append_file(&full_path, &input)
            } else {
                self.vfs.write_file(&full_path, &input)
            };
            if let Err(e) = result {
                ctx.write_err(&format!("tee: {}", e));
                return Ok(1);
            }
        }
        Ok(0)
    }

    fn cmd_date(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        use std::time::SystemTime;
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let days_since_epoch = secs / 86400;
        let time_of_day = secs % 86400;
        let hours = time_of_day / 3600;
        let minutes = (time_of_day % 3600) / 60;
        let seconds = time_of_day % 60;

        let mut y = 1970i64;
        let mut remaining_days = days_since_epoch as i64;
        loop {
            let days_in_year = if (y % 4 == 0 && y % 100 != 0) || y % 400 == 0 {
                366
            } else {
                365
            };
            if remaining_days < days_in_year {
                break;
            }
            remaining_days -= days_in_year;
            y += 1;
        }

        let leap = (y % 4 == 0 && y % 100 != 0) || y % 400 == 0;
        let month_days = [
            31,
            if leap { 29 } else { 28 },
            31,
            30,
            31,
            30,
            31,
            31,
            30,
            31,
            30,
            31,
        ];
        let mut m = 0usize;
        while m < 12 && remaining_days >= month_days[m] as i64 {
            remaining_days -= month_days[m] as i64;
            m += 1;
        }
        let d = remaining_days + 1;

        let output = if let Some(fmt) = args.first() {
            fmt.trim_start_matches('+')
                .replace("%Y", &format!("{:04}", y))
                .replace("%m", &format!("{:02}", m + 1))
                .replace("%d", &format!("{:02}", d))
                .replace("%H", &format!("{:02}", hours))
                .replace("%M", &format!("{:02}", minutes))
                .replace("%S", &format!("{:02}", seconds))
                .replace("%s", &secs.to_string())
        } else {
            format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                y,
                m + 1,
                d,
                hours,
                minutes,
                seconds
            )
        };
        ctx.stdout.writeln(&output).map_err(ShellError::Io)?;
        Ok(0)
    }

    fn cmd_seq(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let (start, step, end) = match args.len() {
            1 => (1i64, 1i64, args[0].parse::<i64>().unwrap_or(1)),
            2 => (
                args[0].parse::<i64>().unwrap_or(1),
                1,
                args[1].parse::<i64>().unwrap_or(1),
            ),
            3 => (
                args[0].parse::<i64>().unwrap_or(1),
                args[1].parse::<i64>().unwrap_or(1),
                args[2].parse::<i64>().unwrap_or(1),
            ),
            _ => {
                ctx.write_err("seq: requires 1 to 3 arguments");
                return Ok(1);
            }
        };

        if step == 0 {
            ctx.write_err("seq: step must not be zero");
            return Ok(1);
        }

        let mut i = start;
        while (step > 0 && i <= end) || (step < 0 && i >= end) {
            ctx.stdout.writeln(&i.to_string()).map_err(ShellError::Io)?;
            i += step;
        }
        Ok(0)
    }

    fn cmd_read(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let var_name = args.first().map(|s| s.as_str()).unwrap_or("REPLY");
        if let Some(data) = ctx.stdin.take() {
            let value = String::from_utf8_lossy(&data)
                .trim_end_matches('\n')
                .to_string();
            if ctx.locals.contains_key(var_name) {
                ctx.locals.insert(var_name.to_string(), value);
            } else {
                self.set_var(var_name, &value);
            }
            Ok(0)
        } else {
            Ok(1)
        }
    }

    /// Read command input: named files when given, otherwise stdin.
    /// Returns None (after reporting) when a file cannot be read.
    fn read_input(
        &self,
        paths: &[String],
        ctx: &mut ExecContext,
        cmd: &str,
    ) -> ShellResult<Option<String>> {
        if paths.is_empty() {
            let data = ctx.stdin.take().unwrap_or_default();
            return Ok(Some(String::from_utf8_lossy(&data).into_owned()));
        }
        let mut combined = String::new();
        for path in paths {
            let full_path = self.vfs.resolve(path);
            match self.vfs.read_to_string(&full_path) {
                Ok(s) => combined.push_str(&s),
                Err(e) => {
                    ctx.write_err(&format!("{}: {}", cmd, e));
                    return Ok(None);
                }
            }
        }
        Ok(Some(combined))
    }
}

/// Parse `-n N`, `-nN` and `-N` line-count flags shared by head/tail.
fn parse_line_count_args(args: &[String]) -> (usize, Vec<String>) {
    let mut n: usize = 10;
    let mut paths = Vec::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];
        if arg == "-n" && i + 1 < args.len() {
            n = args[i + 1].parse().unwrap_or(10);
            i += 2;
        } else if let Some(rest) = arg.strip_prefix("-n") {
            if !rest.is_empty() {
                n = rest.parse().unwrap_or(10);
            }
            i += 1;
        } else if arg.len() > 1
            && arg.starts_with('-')
            && arg[1..].chars().all(|c| c.is_ascii_digit())
        {
            n = arg[1..].parse().unwrap_or(10);
            i += 1;
        } else if !arg.starts_with('-') {
            paths.push(arg.clone());
            i += 1;
        } else {
            i += 1;
        }
    }

    (n, paths)
}

#[cfg(test)]
mod tests {
    use crate::shell::Shell;

    #[tokio::test]
    async fn echo_flags() {
        let mut shell = Shell::new();
        assert_eq!(shell.execute_capture("echo -n abc").await.stdout, "abc");
        assert_eq!(
            shell.execute_capture("echo -e 'a\\tb'").await.stdout,
            "a\tb\n"
        );
    }

    #[tokio::test]
    async fn printf_formats() {
        let mut shell = Shell::new();
        let out = shell
            .execute_capture("printf '%s=%d\\n' count 42")
            .await;
        assert_eq!(out.stdout, "count=42\n");
    }

    #[tokio::test]
    async fn cat_concatenates_files() {
        let mut shell = Shell::new();
        shell.execute_capture("echo one > /a; echo two > /b").await;
        let out = shell.execute_capture("cat /a /b").await;
        assert_eq!(out.stdout, "one\ntwo\n");
    }

    #[tokio::test]
    async fn cat_missing_file() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("cat /nope").await;
        assert_eq!(out.exit_code, 1);
        assert!(out.stderr.starts_with("cat: "));
    }

    #[tokio::test]
    async fn grep_substring_and_exit_codes() {
        let mut shell = Shell::new();
        shell
            .execute_capture("printf 'apple\\nbanana\\ncherry\\n' > /f")
            .await;
        let out = shell.execute_capture("grep an /f").await;
        assert_eq!(out.stdout, "banana\n");
        assert_eq!(out.exit_code, 0);

        let out = shell.execute_capture("grep zzz /f").await;
        assert_eq!(out.exit_code, 1);
    }

    #[tokio::test]
    async fn grep_regex_mode() {
        let mut shell = Shell::new();
        shell
            .execute_capture("printf 'cat1\\ndog2\\ncow3\\n' > /f")
            .await;
        let out = shell.execute_capture("grep -E 'c(at|ow)[0-9]' /f").await;
        assert_eq!(out.stdout, "cat1\ncow3\n");
    }

    #[tokio::test]
    async fn grep_line_numbers_and_invert() {
        let mut shell = Shell::new();
        let out = shell
            .execute_capture("printf 'a\\nb\\na\\n' | grep -n a")
            .await;
        assert_eq!(out.stdout, "1:a\n3:a\n");
        let out = shell
            .execute_capture("printf 'a\\nb\\na\\n' | grep -v a")
            .await;
        assert_eq!(out.stdout, "b\n");
    }

    #[tokio::test]
    async fn wc_counts() {
        let mut shell = Shell::new();
        let out = shell
            .execute_capture("printf 'one two\\nthree\\n' | wc -l")
            .await;
        assert_eq!(out.stdout.trim(), "2");
        let out = shell
            .execute_capture("printf 'one two\\nthree\\n' | wc -w")
            .await;
        assert_eq!(out.stdout.trim(), "3");
    }

    #[tokio::test]
    async fn head_and_tail() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("seq 1 10 | head -n 3").await;
        assert_eq!(out.stdout, "1\n2\n3\n");
        let out = shell.execute_capture("seq 1 10 | tail -n 2").await;
        assert_eq!(out.stdout, "9\n10\n");
    }

    #[tokio::test]
    async fn sort_variants() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("printf 'b\\na\\nc\\n' | sort").await;
        assert_eq!(out.stdout, "a\nb\nc\n");
        let out = shell
            .execute_capture("printf '10\\n9\\n100\\n' | sort -n")
            .await;
        assert_eq!(out.stdout, "9\n10\n100\n");
        let out = shell
            .execute_capture("printf 'b\\na\\n' | sort -r")
            .await;
        assert_eq!(out.stdout, "b\na\n");
    }

    #[tokio::test]
    async fn uniq_collapses_runs() {
        let mut shell = Shell::new();
        let out = shell
            .execute_capture("printf 'a\\na\\nb\\na\\n' | uniq")
            .await;
        assert_eq!(out.stdout, "a\nb\na\n");
    }

    #[tokio::test]
    async fn tr_translates_and_deletes() {
        let mut shell = Shell::new();
        let out = shell
            .execute_capture("echo hello | tr a-z A-Z")
            .await;
        assert_eq!(out.stdout, "HELLO\n");
        let out = shell.execute_capture("echo hello | tr -d l").await;
        assert_eq!(out.stdout, "heo\n");
    }

    #[tokio::test]
    async fn cut_fields() {
        let mut shell = Shell::new();
        let out = shell
            .execute_capture("echo a:b:c | cut -d : -f 2")
            .await;
        assert_eq!(out.stdout, "b\n");
    }

    #[tokio::test]
    async fn tee_writes_and_passes_through() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("echo data | tee /copy.txt").await;
        assert_eq!(out.stdout, "data\n");
        let out = shell.execute_capture("cat /copy.txt").await;
        assert_eq!(out.stdout, "data\n");
    }

    #[tokio::test]
    async fn seq_with_step() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("seq 0 2 6").await;
        assert_eq!(out.stdout, "0\n2\n4\n6\n");
    }

    #[tokio::test]
    async fn read_sets_variable() {
        let mut shell = Shell::new();
        shell.execute_capture("echo value | read MYVAR").await;
        assert_eq!(shell.get_var("MYVAR"), Some("value"));
    }
}
