//! Integer arithmetic for `$((...))`

use super::ExecContext;
use crate::shell::Shell;

/// Characters allowed in an arithmetic expression before expansion.
/// Anything else makes the whole expression evaluate to 0, so text
/// smuggled into `$((...))` can never reach the evaluator.
fn allowed_char(c: char) -> bool {
    c.is_alphanumeric()
        || c == '_'
        || c.is_whitespace()
        || matches!(c, '+' | '-' | '*' | '/' | '%' | '(' | ')' | '$')
}

impl Shell {
    pub(crate) fn evaluate_arithmetic(&self, expr: &str, ctx: &ExecContext) -> i64 {
        let expr = expr.trim();
        if !expr.chars().all(allowed_char) {
            return 0;
        }
        let expanded = self.expand_arithmetic_vars(expr, ctx);
        if expanded.trim().is_empty() {
            return 0;
        }
        self.parse_arithmetic_expr(&mut expanded.chars().peekable())
            .unwrap_or(0)
    }

    /// Substitute `$name` and bare `name` references. Unset or
    /// non-numeric variables read as 0 (checked again after
    /// substitution by the main guard in the parser).
    fn expand_arithmetic_vars(&self, expr: &str, ctx: &ExecContext) -> String {
        let mut result = String::new();
        let mut chars = expr.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = self.get_variable_value(&name, ctx);
                result.push_str(&value);
            } else if c.is_alphabetic() || c == '_' {
                let mut name = String::from(c);
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = self.get_variable_value(&name, ctx);
                if value.is_empty() {
                    result.push('0');
                } else {
                    result.push_str(&value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    fn parse_arithmetic_expr(
        &self,
        chars: &mut std::iter::Peekable<std::str::Chars>,
    ) -> Option<i64> {
        self.parse_additive(chars)
    }

    fn parse_additive(&self, chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<i64> {
        let mut left = self.parse_multiplicative(chars)?;

        loop {
            self.skip_whitespace(chars);
            match chars.peek() {
                Some('+') => {
                    chars.next();
                    let right = self.parse_multiplicative(chars)?;
                    left = left.wrapping_add(right);
                }
                Some('-') => {
                    chars.next();
                    let right = self.parse_multiplicative(chars)?;
                    left = left.wrapping_sub(right);
                }
                _ => break,
            }
        }

        Some(left)
    }

    fn parse_multiplicative(
        &self,
        chars: &mut std::iter::Peekable<std::str::Chars>,
    ) -> Option<i64> {
        let mut left = self.parse_unary(chars)?;

        loop {
            self.skip_whitespace(chars);
            match chars.peek() {
                Some('*') => {
                    chars.next();
                    let right = self.parse_unary(chars)?;
                    left = left.wrapping_mul(right);
                }
                Some('/') => {
                    chars.next();
                    let right = self.parse_unary(chars)?;
                    if right == 0 {
                        return None;
                    }
                    // Wrapping: i64::MIN / -1 must not trap
                    left = left.wrapping_div(right);
                }
                Some('%') => {
                    chars.next();
                    let right = self.parse_unary(chars)?;
                    if right == 0 {
                        return None;
                    }
                    left = left.wrapping_rem(right);
                }
                _ => break,
            }
        }

        Some(left)
    }

    fn parse_unary(&self, chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<i64> {
        self.skip_whitespace(chars);

        match chars.peek() {
            Some('-') => {
                chars.next();
                Some(self.parse_primary(chars)?.wrapping_neg())
            }
            Some('+') => {
                chars.next();
                self.parse_primary(chars)
            }
            _ => self.parse_primary(chars),
        }
    }

    fn parse_primary(&self, chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<i64> {
        self.skip_whitespace(chars);

        match chars.peek() {
            Some('(') => {
                chars.next();
                let value = self.parse_arithmetic_expr(chars)?;
                self.skip_whitespace(chars);
                if chars.next() != Some(')') {
                    return None;
                }
                Some(value)
            }
            Some(c) if c.is_ascii_digit() => {
                let mut num = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() {
                        num.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                num.parse::<i64>().ok()
            }
            Some(_) | None => Some(0),
        }
    }

    fn skip_whitespace(&self, chars: &mut std::iter::Peekable<std::str::Chars>) {
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::ExecContext;
    use crate::shell::Shell;

    fn eval(shell: &Shell, expr: &str) -> i64 {
        shell.evaluate_arithmetic(expr, &ExecContext::default())
    }

    #[test]
    fn basic_operations() {
        let shell = Shell::new();
        assert_eq!(eval(&shell, "1 + 2"), 3);
        assert_eq!(eval(&shell, "10 - 4"), 6);
        assert_eq!(eval(&shell, "3 * 4"), 12);
        assert_eq!(eval(&shell, "10 / 3"), 3);
        assert_eq!(eval(&shell, "10 % 3"), 1);
    }

    #[test]
    fn precedence_and_parens() {
        let shell = Shell::new();
        assert_eq!(eval(&shell, "1 + 2 * 3"), 7);
        assert_eq!(eval(&shell, "(1 + 2) * 3"), 9);
        assert_eq!(eval(&shell, "-3 + 5"), 2);
    }

    #[test]
    fn variables_resolve() {
        let mut shell = Shell::new();
        shell.set_var("x", "10");
        assert_eq!(eval(&shell, "x + 1"), 11);
        assert_eq!(eval(&shell, "$x * 2"), 20);
    }

    #[test]
    fn unset_variable_is_zero() {
        let shell = Shell::new();
        assert_eq!(eval(&shell, "missing + 5"), 5);
    }

    #[test]
    fn division_by_zero_is_zero() {
        let shell = Shell::new();
        assert_eq!(eval(&shell, "5 / 0"), 0);
        assert_eq!(eval(&shell, "5 % 0"), 0);
    }

    #[test]
    fn min_over_minus_one_wraps() {
        let shell = Shell::new();
        let min = "(0 - 9223372036854775807 - 1)";
        assert_eq!(eval(&shell, &format!("{} / (0 - 1)", min)), i64::MIN);
        assert_eq!(eval(&shell, &format!("{} % (0 - 1)", min)), 0);
        assert_eq!(eval(&shell, &format!("-{}", min)), i64::MIN);
    }

    #[test]
    fn disallowed_characters_yield_zero() {
        let shell = Shell::new();
        assert_eq!(eval(&shell, "1; rm -r /"), 0);
        assert_eq!(eval(&shell, "`ls`"), 0);
        assert_eq!(eval(&shell, "1 + 2 > 3"), 0);
    }

    #[test]
    fn empty_expression_is_zero() {
        let shell = Shell::new();
        assert_eq!(eval(&shell, ""), 0);
        assert_eq!(eval(&shell, "   "), 0);
    }

    #[tokio::test]
    async fn arithmetic_in_command() {
        let mut shell = Shell::new();
        let out = shell.execute_capture("echo $((2 + 3 * 4))").await;
        assert_eq!(out.stdout, "14\n");
    }

    #[tokio::test]
    async fn counter_loop() {
        let mut shell = Shell::new();
        let out = shell
            .execute_capture("i=0; while test $i -lt 3; do echo $i; i=$((i + 1)); done")
            .await;
        assert_eq!(out.stdout, "0\n1\n2\n");
    }
}
