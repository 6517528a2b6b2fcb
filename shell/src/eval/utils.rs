//! Shared helpers for the evaluator

pub(crate) fn format_mtime(mtime: u64) -> String {
    let months = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    let days_since_epoch = mtime / 86400;
    let time_of_day = mtime % 86400;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;

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

    format!("{} {:>2} {:02}:{:02}", months[m], d, hours, minutes)
}

pub(crate) fn interpret_escape_sequences(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('0') => result.push('\0'),
                Some('a') => result.push('\x07'),
                Some('b') => result.push('\x08'),
                Some('f') => result.push('\x0C'),
                Some('v') => result.push('\x0B'),
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
    result
}

pub(crate) fn contains_glob_chars(s: &str) -> bool {
    s.chars().any(|c| c == '*' || c == '?' || c == '[')
}

enum PatternItem {
    Literal(char),
    AnyChar,
    Star,
    Class { negated: bool, chars: Vec<char> },
}

/// Compile a glob pattern into a flat item list. `[a-z]` classes are
/// expanded to their member characters; an unterminated `[` is taken
/// literally.
fn compile_pattern(pattern: &str) -> Vec<PatternItem> {
    let mut items = Vec::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                // Consecutive stars collapse into one
                if !matches!(items.last(), Some(PatternItem::Star)) {
                    items.push(PatternItem::Star);
                }
            }
            '?' => items.push(PatternItem::AnyChar),
            '[' => {
                let mut class = Vec::new();
                let mut negated = false;
                let mut first = true;
                let mut closed = false;

                while let Some(c) = chars.next() {
                    if c == ']' && !first {
                        closed = true;
                        break;
                    }
                    if (c == '!' || c == '^') && first {
                        negated = true;
                        first = false;
                        continue;
                    }
                    first = false;

                    if chars.peek() == Some(&'-') {
                        chars.next();
                        match chars.next() {
                            Some(']') => {
                                class.push(c);
                                class.push('-');
                                closed = true;
                                break;
                            }
                            Some(end) => {
                                for ch in c..=end {
                                    class.push(ch);
                                }
                                continue;
                            }
                            None => {
                                class.push(c);
                                class.push('-');
                                break;
                            }
                        }
                    }
                    class.push(c);
                }

                if closed {
                    items.push(PatternItem::Class {
                        negated,
                        chars: class,
                    });
                } else {
                    items.push(PatternItem::Literal('['));
                    for ch in class {
                        items.push(PatternItem::Literal(ch));
                    }
                }
            }
            c => items.push(PatternItem::Literal(c)),
        }
    }

    items
}

/// Iterative glob match with a single stored backtrack point per `*`.
/// Runs in O(pattern * name) worst case with no recursion.
pub(crate) fn match_glob_pattern(pattern: &str, name: &str) -> bool {
    let items = compile_pattern(pattern);
    let name: Vec<char> = name.chars().collect();

    let mut pi = 0; // pattern index
    let mut ni = 0; // name index
    let mut star_pi: Option<usize> = None; // item after the last '*'
    let mut star_ni = 0; // name position when that '*' matched empty

    while ni < name.len() {
        let matched = match items.get(pi) {
            Some(PatternItem::Star) => {
                star_pi = Some(pi + 1);
                star_ni = ni;
                pi += 1;
                continue;
            }
            Some(PatternItem::AnyChar) => true,
            Some(PatternItem::Literal(c)) => *c == name[ni],
            Some(PatternItem::Class { negated, chars }) => chars.contains(&name[ni]) != *negated,
            None => false,
        };

        if matched {
            pi += 1;
            ni += 1;
        } else if let Some(resume) = star_pi {
            // Let the star absorb one more character and retry
            star_ni += 1;
            ni = star_ni;
            pi = resume;
        } else {
            return false;
        }
    }

    // Remaining pattern must be all stars
    while matches!(items.get(pi), Some(PatternItem::Star)) {
        pi += 1;
    }
    pi == items.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_match() {
        assert!(match_glob_pattern("file.txt", "file.txt"));
        assert!(!match_glob_pattern("file.txt", "file.log"));
    }

    #[test]
    fn star_matches_any_run() {
        assert!(match_glob_pattern("*.txt", "notes.txt"));
        assert!(match_glob_pattern("*.txt", ".txt"));
        assert!(!match_glob_pattern("*.txt", "notes.log"));
        assert!(match_glob_pattern("*", ""));
        assert!(match_glob_pattern("a*b*c", "aXXbYYc"));
        assert!(!match_glob_pattern("a*b*c", "aXXbYY"));
    }

    #[test]
    fn question_matches_one_char() {
        assert!(match_glob_pattern("f?le", "file"));
        assert!(!match_glob_pattern("f?le", "fle"));
        assert!(!match_glob_pattern("?", ""));
    }

    #[test]
    fn star_backtracks() {
        // The first 'b' seen is not the right one
        assert!(match_glob_pattern("*b c", "a b b c"));
        assert!(match_glob_pattern("*abc", "aabcabc"));
    }

    #[test]
    fn character_classes() {
        assert!(match_glob_pattern("[abc].txt", "a.txt"));
        assert!(!match_glob_pattern("[abc].txt", "d.txt"));
        assert!(match_glob_pattern("[a-z]*", "hello"));
        assert!(!match_glob_pattern("[!a-z]*", "hello"));
        assert!(match_glob_pattern("[!a-z]*", "Hello"));
    }

    #[test]
    fn unterminated_class_is_literal() {
        assert!(match_glob_pattern("[ab", "[ab"));
    }

    #[test]
    fn trailing_stars_match_empty() {
        assert!(match_glob_pattern("abc*", "abc"));
        assert!(match_glob_pattern("abc**", "abc"));
    }

    #[test]
    fn escape_sequences() {
        assert_eq!(interpret_escape_sequences("a\\tb\\n"), "a\tb\n");
        assert_eq!(interpret_escape_sequences("a\\qb"), "a\\qb");
    }

    #[test]
    fn mtime_formatting() {
        // 2021-03-01 00:00:00 UTC
        assert_eq!(format_mtime(1614556800), "Mar  1 00:00");
    }

    #[test]
    fn glob_char_detection() {
        assert!(contains_glob_chars("*.rs"));
        assert!(contains_glob_chars("file?"));
        assert!(!contains_glob_chars("plain.txt"));
    }
}
