//! Brace expansion pre-pass
//!
//! Expands `{a,b,c}` lists and `{1..5}` numeric ranges before lexing,
//! the way POSIX shells perform brace expansion before any other word
//! processing. Quoted text is never expanded, and a brace group that
//! contains unquoted whitespace at its top level is left alone so that
//! function bodies like `f() { echo hi; }` pass through untouched.

/// Expand brace patterns in a raw input line.
///
/// Returns the input with every expandable brace group replaced by the
/// space-joined cartesian product of its alternatives. Input without
/// brace groups is returned unchanged.
pub fn expand_braces(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut word = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut in_backtick = false;
    let mut escaped = false;
    let mut prev_dollar = false;
    let mut sub_depth = 0usize;

    // Walk the line word by word; only unquoted words are candidates.
    // Quote state carries across word boundaries so that quoted
    // whitespace stays inside a single word. `$(...)` and backtick
    // substitutions are kept whole; their contents expand when the
    // inner command runs.
    for c in input.chars() {
        if escaped {
            word.push(c);
            escaped = false;
            prev_dollar = false;
            continue;
        }
        let was_dollar = prev_dollar;
        prev_dollar = c == '$' && !in_single;
        match c {
            '\\' if !in_single => {
                word.push(c);
                escaped = true;
            }
            '\'' if !in_double => {
                in_single = !in_single;
                word.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                word.push(c);
            }
            '`' if !in_single && !in_double => {
                in_backtick = !in_backtick;
                word.push(c);
            }
            '(' if !in_single && !in_double && (was_dollar || sub_depth > 0) => {
                sub_depth += 1;
                word.push(c);
            }
            ')' if !in_single && !in_double && sub_depth > 0 => {
                sub_depth -= 1;
                word.push(c);
            }
            c if c.is_whitespace()
                && !in_single
                && !in_double
                && !in_backtick
                && sub_depth == 0 =>
            {
                if !word.is_empty() {
                    out.push_str(&expand_word(&word));
                    word.clear();
                }
                out.push(c);
            }
            _ => word.push(c),
        }
    }
    if !word.is_empty() {
        out.push_str(&expand_word(&word));
    }
    out
}

/// Expand the first top-level brace group in a single word, recursing
/// on the results so nested and sequential groups expand fully.
fn expand_word(word: &str) -> String {
    // Words carrying a command substitution are left whole; the inner
    // shell expands them when the substitution is evaluated.
    if contains_command_sub(word) {
        return word.to_string();
    }

    let group = match find_group(word) {
        Some(g) => g,
        None => return word.to_string(),
    };

    let prefix = &word[..group.open];
    let body = &word[group.open + 1..group.close];
    let suffix = &word[group.close + 1..];

    // ${...} is parameter expansion, not a brace pattern
    let is_param = group.open > 0 && word.as_bytes()[group.open - 1] == b'$';

    let alternatives = match split_group(body) {
        Some(alts) if !is_param => alts,
        _ => {
            // Not expandable: keep the braces literal and continue
            // scanning past this group.
            let rest = expand_word(suffix);
            return format!("{}{{{}}}{}", prefix, body, rest);
        }
    };

    let expanded: Vec<String> = alternatives
        .iter()
        .map(|alt| expand_word(&format!("{}{}{}", prefix, alt, suffix)))
        .collect();
    expanded.join(" ")
}

/// True when the word contains an unquoted `$(` or backtick.
fn contains_command_sub(word: &str) -> bool {
    let mut in_single = false;
    let mut escaped = false;
    let mut prev_dollar = false;
    for c in word.chars() {
        if escaped {
            escaped = false;
            prev_dollar = false;
            continue;
        }
        match c {
            '\\' if !in_single => escaped = true,
            '\'' => in_single = !in_single,
            '`' if !in_single => return true,
            '(' if !in_single && prev_dollar => return true,
            _ => {}
        }
        prev_dollar = c == '$' && !in_single;
    }
    false
}

struct Group {
    open: usize,
    close: usize,
}

/// Locate the first unquoted top-level `{...}` group in a word.
fn find_group(word: &str) -> Option<Group> {
    let bytes = word.as_bytes();
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut open = 0usize;

    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if !in_single => escaped = true,
            b'\'' if !in_double => in_single = !in_single,
            b'"' if !in_single => in_double = !in_double,
            b'{' if !in_single && !in_double => {
                if depth == 0 {
                    open = i;
                }
                depth += 1;
            }
            b'}' if !in_single && !in_double => {
                if depth == 1 {
                    return Some(Group { open, close: i });
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }
    }
    None
}

/// Split a brace group body into alternatives.
///
/// Returns `None` when the group is not expandable: no top-level comma
/// and not a valid `N..M` range, or top-level unquoted whitespace
/// (which marks shell syntax such as a function body, not a brace
/// pattern).
fn split_group(body: &str) -> Option<Vec<String>> {
    if let Some(range) = expand_range(body) {
        return Some(range);
    }

    let mut alternatives = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;
    let mut depth = 0usize;
    let mut saw_comma = false;

    for c in body.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if !in_single => {
                current.push(c);
                escaped = true;
            }
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(c);
            }
            '{' if !in_single && !in_double => {
                depth += 1;
                current.push(c);
            }
            '}' if !in_single && !in_double => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 && !in_single && !in_double => {
                saw_comma = true;
                alternatives.push(std::mem::take(&mut current));
            }
            c if c.is_whitespace() && depth == 0 && !in_single && !in_double => {
                return None;
            }
            _ => current.push(c),
        }
    }
    if !saw_comma {
        return None;
    }
    alternatives.push(current);
    Some(alternatives)
}

/// Expand `N..M` integer ranges, ascending or descending.
fn expand_range(body: &str) -> Option<Vec<String>> {
    let (start, end) = body.split_once("..")?;
    let start: i64 = start.parse().ok()?;
    let end: i64 = end.parse().ok()?;
    let items: Vec<String> = if start <= end {
        (start..=end).map(|n| n.to_string()).collect()
    } else {
        (end..=start).rev().map(|n| n.to_string()).collect()
    };
    Some(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_list() {
        assert_eq!(expand_braces("echo {a,b,c}"), "echo a b c");
    }

    #[test]
    fn prefix_and_suffix() {
        assert_eq!(
            expand_braces("touch file{1,2}.txt"),
            "touch file1.txt file2.txt"
        );
    }

    #[test]
    fn ascending_range() {
        assert_eq!(expand_braces("echo {1..5}"), "echo 1 2 3 4 5");
    }

    #[test]
    fn descending_range() {
        assert_eq!(expand_braces("echo {3..1}"), "echo 3 2 1");
    }

    #[test]
    fn nested_groups() {
        assert_eq!(expand_braces("echo {a,b{1,2}}"), "echo a b1 b2");
    }

    #[test]
    fn cartesian_product() {
        assert_eq!(expand_braces("echo {a,b}{1,2}"), "echo a1 a2 b1 b2");
    }

    #[test]
    fn no_comma_passes_through() {
        assert_eq!(expand_braces("echo {abc}"), "echo {abc}");
    }

    #[test]
    fn single_quoted_is_untouched() {
        assert_eq!(expand_braces("echo '{a,b}'"), "echo '{a,b}'");
    }

    #[test]
    fn double_quoted_is_untouched() {
        assert_eq!(expand_braces("echo \"{a,b}\""), "echo \"{a,b}\"");
    }

    #[test]
    fn function_body_is_untouched() {
        let src = "greet() { echo hello; }";
        assert_eq!(expand_braces(src), src);
    }

    #[test]
    fn braced_variable_is_untouched() {
        assert_eq!(expand_braces("echo ${foo}"), "echo ${foo}");
    }

    #[test]
    fn command_sub_is_untouched() {
        assert_eq!(expand_braces("echo $(echo {a,b})"), "echo $(echo {a,b})");
        assert_eq!(expand_braces("echo `ls {a,b}`"), "echo `ls {a,b}`");
    }

    #[test]
    fn param_default_with_comma_is_untouched() {
        assert_eq!(expand_braces("echo ${x:-a,b}"), "echo ${x:-a,b}");
    }

    #[test]
    fn escaped_comma_is_literal() {
        assert_eq!(expand_braces("echo {a\\,b}"), "echo {a\\,b}");
    }

    #[test]
    fn empty_input() {
        assert_eq!(expand_braces(""), "");
    }
}
