//! Parser for sandsh scripts
//!
//! Parses a token stream into an AST.

use crate::ast::*;
use crate::lexer::Token;
use chumsky::prelude::*;

/// Parse a token stream into a Script AST
pub fn parser() -> impl Parser<Token, Script, Error = Simple<Token>> {
    statement()
        .repeated()
        .map(|statements| Script { statements })
        .then_ignore(end())
}

/// Parse a single statement
fn statement() -> impl Parser<Token, Statement, Error = Simple<Token>> + Clone {
    recursive(|stmt| {
        // Statement separators (semicolon or newline)
        let sep = filter(|t| matches!(t, Token::Semicolon | Token::Newline)).repeated();

        // Empty statement (just separators)
        let empty = sep.at_least(1).to(Statement::Empty);

        // Assignment: name=value
        let assignment = word()
            .then_ignore(just(Token::Equals))
            .then(word().or_not())
            .map(|(name, value)| {
                Statement::Assignment(Assignment {
                    name: word_to_string(&name),
                    value: value.unwrap_or_else(Word::empty),
                })
            });

        let break_stmt = just(Token::Break).to(Statement::Break);
        let continue_stmt = just(Token::Continue).to(Statement::Continue);

        let return_stmt = just(Token::Return)
            .ignore_then(word().or_not())
            .map(Statement::Return);

        let func_def = function_def(stmt.clone());
        let if_stmt = if_statement(stmt.clone());
        let for_stmt = for_statement(stmt.clone());
        let while_stmt = while_statement(stmt.clone());
        let until_stmt = until_statement(stmt.clone());
        let case_stmt = case_statement(stmt.clone());

        // Command list: pipeline { && | || pipeline }*
        let command_list_stmt = pipeline()
            .then(
                choice((
                    just(Token::AndAnd).to(ListOp::And),
                    just(Token::OrOr).to(ListOp::Or),
                ))
                .then(pipeline())
                .repeated(),
            )
            .map(|(first, rest)| {
                if rest.is_empty() {
                    Statement::Pipeline(first)
                } else {
                    Statement::CommandList { first, rest }
                }
            });

        choice((
            empty,
            break_stmt,
            continue_stmt,
            return_stmt,
            func_def,
            if_stmt,
            for_stmt,
            while_stmt,
            until_stmt,
            case_stmt,
            assignment,
            command_list_stmt,
        ))
        .padded_by(sep)
    })
}

/// Parse an if statement.
///
/// `if condition; then body; else body; fi` -- else-if chains are
/// expressed by nesting a new `if` inside the else body.
fn if_statement(
    stmt: impl Parser<Token, Statement, Error = Simple<Token>> + Clone,
) -> impl Parser<Token, Statement, Error = Simple<Token>> + Clone {
    just(Token::If)
        .ignore_then(pipeline())
        .then_ignore(just(Token::Semicolon).or_not())
        .then_ignore(just(Token::Newline).repeated())
        .then_ignore(just(Token::Then))
        .then(stmt.clone().repeated())
        .then(just(Token::Else).ignore_then(stmt.repeated()).or_not())
        .then_ignore(just(Token::Fi))
        .map(|((condition, then_body), else_body)| {
            Statement::If(IfStatement {
                condition: Box::new(condition),
                then_body,
                else_body,
            })
        })
}

/// Parse a for loop: `for var in items; do body; done`
fn for_statement(
    stmt: impl Parser<Token, Statement, Error = Simple<Token>> + Clone,
) -> impl Parser<Token, Statement, Error = Simple<Token>> + Clone {
    just(Token::For)
        .ignore_then(word())
        .then_ignore(just(Token::In))
        .then(word().repeated())
        .then_ignore(just(Token::Semicolon).or_not())
        .then_ignore(just(Token::Newline).repeated())
        .then_ignore(just(Token::Do))
        .then(stmt.repeated())
        .then_ignore(just(Token::Done))
        .map(|((var, items), body)| {
            Statement::For(ForLoop {
                variable: word_to_string(&var),
                items,
                body,
            })
        })
}

/// Parse a while loop: `while condition; do body; done`
fn while_statement(
    stmt: impl Parser<Token, Statement, Error = Simple<Token>> + Clone,
) -> impl Parser<Token, Statement, Error = Simple<Token>> + Clone {
    just(Token::While)
        .ignore_then(pipeline())
        .then_ignore(just(Token::Semicolon).or_not())
        .then_ignore(just(Token::Newline).repeated())
        .then_ignore(just(Token::Do))
        .then(stmt.repeated())
        .then_ignore(just(Token::Done))
        .map(|(condition, body)| {
            Statement::While(WhileLoop {
                condition: Box::new(condition),
                body,
            })
        })
}

/// Parse an until loop: `until condition; do body; done`
fn until_statement(
    stmt: impl Parser<Token, Statement, Error = Simple<Token>> + Clone,
) -> impl Parser<Token, Statement, Error = Simple<Token>> + Clone {
    just(Token::Until)
        .ignore_then(pipeline())
        .then_ignore(just(Token::Semicolon).or_not())
        .then_ignore(just(Token::Newline).repeated())
        .then_ignore(just(Token::Do))
        .then(stmt.repeated())
        .then_ignore(just(Token::Done))
        .map(|(condition, body)| {
            Statement::Until(UntilLoop {
                condition: Box::new(condition),
                body,
            })
        })
}

/// Parse a case statement.
///
/// `case word in pattern|pattern) body ;; ... esac` -- the `;;`
/// terminator is required on every arm.
fn case_statement(
    stmt: impl Parser<Token, Statement, Error = Simple<Token>> + Clone,
) -> impl Parser<Token, Statement, Error = Simple<Token>> + Clone {
    let sep = filter(|t| matches!(t, Token::Semicolon | Token::Newline)).repeated();

    let arm = word()
        .separated_by(just(Token::Pipe))
        .at_least(1)
        .then_ignore(just(Token::RightParen))
        .then(stmt.repeated())
        .then_ignore(just(Token::DoubleSemi))
        .map(|(patterns, body)| CaseArm { patterns, body })
        .padded_by(sep);

    just(Token::Case)
        .ignore_then(word())
        .then_ignore(just(Token::In))
        .then(arm.repeated())
        .then_ignore(just(Token::Esac))
        .map(|(word, arms)| Statement::Case(CaseStatement { word, arms }))
}

/// Parse a function definition: `name() { body }` or `function name { body }`
fn function_def(
    stmt: impl Parser<Token, Statement, Error = Simple<Token>> + Clone,
) -> impl Parser<Token, Statement, Error = Simple<Token>> + Clone {
    let paren_style = word()
        .then_ignore(just(Token::LeftParen))
        .then_ignore(just(Token::RightParen))
        .then_ignore(just(Token::LeftBrace))
        .then(stmt.clone().repeated())
        .then_ignore(just(Token::RightBrace))
        .map(|(name, body)| {
            Statement::FunctionDef(FunctionDef {
                name: word_to_string(&name),
                body,
            })
        });

    let function_keyword = just(Token::Function)
        .ignore_then(word())
        .then_ignore(
            just(Token::LeftParen)
                .then(just(Token::RightParen))
                .or_not(),
        )
        .then_ignore(just(Token::LeftBrace))
        .then(stmt.repeated())
        .then_ignore(just(Token::RightBrace))
        .map(|(name, body)| {
            Statement::FunctionDef(FunctionDef {
                name: word_to_string(&name),
                body,
            })
        });

    paren_style.or(function_keyword)
}

/// Parse a pipeline: command { | command }*
fn pipeline() -> impl Parser<Token, Pipeline, Error = Simple<Token>> + Clone {
    command()
        .separated_by(just(Token::Pipe))
        .at_least(1)
        .map(|commands| Pipeline { commands })
}

/// Parse a single command: name [args...] with redirections anywhere
/// after the name.
fn command() -> impl Parser<Token, Command, Error = Simple<Token>> + Clone {
    enum Part {
        Arg(Word),
        Redirect(Redirection),
    }

    word()
        .then(
            choice((
                redirection().map(Part::Redirect),
                word().map(Part::Arg),
            ))
            .repeated(),
        )
        .map(|(name, parts)| {
            let mut args = Vec::new();
            let mut redirections = Vec::new();
            for part in parts {
                match part {
                    Part::Arg(w) => args.push(w),
                    Part::Redirect(r) => redirections.push(r),
                }
            }
            Command {
                name,
                args,
                redirections,
            }
        })
}

/// Parse a redirection
fn redirection() -> impl Parser<Token, Redirection, Error = Simple<Token>> + Clone {
    let with_target = |token: Token, kind: RedirectKind| {
        just(token).ignore_then(word()).map(move |target| Redirection {
            kind,
            target: Some(target),
        })
    };

    choice((
        with_target(Token::RedirectAppend, RedirectKind::StdoutAppend),
        with_target(Token::RedirectErrAppend, RedirectKind::StderrAppend),
        with_target(Token::RedirectOut, RedirectKind::StdoutWrite),
        with_target(Token::RedirectErr, RedirectKind::StderrWrite),
        with_target(Token::RedirectIn, RedirectKind::StdinRead),
        with_target(Token::RedirectBoth, RedirectKind::BothWrite),
        just(Token::RedirectErrToOut).to(Redirection {
            kind: RedirectKind::StderrToStdout,
            target: None,
        }),
    ))
}

fn word() -> impl Parser<Token, Word, Error = Simple<Token>> + Clone {
    let simple_word = filter_map(|span, tok| match tok {
        Token::Word(s) => Ok(Word {
            parts: vec![WordPart::Literal(s)],
        }),
        Token::SingleQuoted(s) => Ok(Word {
            parts: vec![WordPart::SingleQuoted(s)],
        }),
        Token::CompoundWord(segments) => Ok(Word {
            parts: segments
                .into_iter()
                .map(|(is_sq, s)| {
                    if is_sq {
                        WordPart::SingleQuoted(s)
                    } else {
                        WordPart::Literal(s)
                    }
                })
                .collect(),
        }),
        Token::Equals => Ok(Word {
            parts: vec![WordPart::Literal("=".to_string())],
        }),
        Token::SpecialVar(name) => Ok(Word {
            parts: vec![WordPart::Variable(name)],
        }),
        Token::BracedVariable(s) => Ok(Word {
            parts: vec![WordPart::BracedVariable(s)],
        }),
        _ => Err(Simple::expected_input_found(span, None, Some(tok))),
    });

    let var_ref = just(Token::Dollar).ignore_then(filter_map(|span, tok| match tok {
        Token::Word(s) => Ok(Word {
            parts: vec![WordPart::Variable(s)],
        }),
        _ => Err(Simple::expected_input_found(span, None, Some(tok))),
    }));

    let arithmetic = just(Token::DollarDoubleParen)
        .ignore_then(collect_until_double_paren())
        .map(|expr| Word {
            parts: vec![WordPart::Arithmetic(expr)],
        });

    let command_sub = just(Token::DollarParen)
        .ignore_then(collect_until_paren())
        .map(|cmd| Word {
            parts: vec![WordPart::CommandSub(cmd)],
        });

    let backtick_sub = just(Token::Backtick)
        .ignore_then(collect_until_backtick())
        .map(|cmd| Word {
            parts: vec![WordPart::CommandSub(cmd)],
        });

    choice((arithmetic, command_sub, backtick_sub, var_ref, simple_word))
}

/// Convert a token to a string that can be safely re-parsed by the lexer.
/// Word tokens containing special characters are wrapped in double quotes.
fn token_to_safe_string(tok: Token) -> String {
    fn quote_bare(s: String) -> String {
        let needs_quoting = s.chars().any(|c| {
            c.is_whitespace()
                || matches!(
                    c,
                    '|' | '&'
                        | ';'
                        | '<'
                        | '>'
                        | '('
                        | ')'
                        | '{'
                        | '}'
                        | '$'
                        | '"'
                        | '\''
                        | '#'
                        | '='
                        | '\\'
                        | '`'
                )
        });
        if needs_quoting {
            let mut escaped = String::with_capacity(s.len() + 2);
            escaped.push('"');
            for c in s.chars() {
                if c == '\\' || c == '"' {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            escaped.push('"');
            escaped
        } else {
            s
        }
    }

    match tok {
        Token::Word(s) => quote_bare(s),
        Token::SingleQuoted(s) => format!("'{}'", s),
        Token::CompoundWord(segments) => segments
            .into_iter()
            .map(|(is_sq, s)| {
                if is_sq {
                    format!("'{}'", s)
                } else {
                    quote_bare(s)
                }
            })
            .collect::<Vec<_>>()
            .join(""),
        Token::Newline => ";".to_string(),
        other => other.to_string(),
    }
}

/// Join re-stringified tokens with spaces, except after `$` (so `$` +
/// `foo` reads back as a variable reference).
fn join_parts(parts: Vec<String>) -> String {
    let mut result = String::new();
    let mut prev_was_dollar = false;
    for part in parts {
        if prev_was_dollar
            && part
                .chars()
                .next()
                .map(|c| c.is_alphanumeric() || c == '_')
                .unwrap_or(false)
        {
            result.push_str(&part);
        } else if !result.is_empty()
            && !prev_was_dollar
            && !part.starts_with('$')
            && !part.starts_with('(')
        {
            result.push(' ');
            result.push_str(&part);
        } else {
            result.push_str(&part);
        }
        prev_was_dollar = part == "$";
    }
    result
}

fn collect_until_double_paren() -> impl Parser<Token, String, Error = Simple<Token>> + Clone {
    recursive(|inner| {
        choice((
            just(Token::LeftParen)
                .ignore_then(inner.clone())
                .then_ignore(just(Token::RightParen))
                .map(|s| format!("({})", s)),
            filter(|t| !matches!(t, Token::RightParen | Token::LeftParen))
                .map(token_to_safe_string),
        ))
        .repeated()
        .map(join_parts)
    })
    .then_ignore(just(Token::RightParen))
    .then_ignore(just(Token::RightParen))
}

fn collect_until_paren() -> impl Parser<Token, String, Error = Simple<Token>> + Clone {
    recursive(|inner| {
        choice((
            just(Token::LeftParen)
                .ignore_then(inner.clone())
                .then_ignore(just(Token::RightParen))
                .map(|s| format!("({})", s)),
            just(Token::DollarParen)
                .ignore_then(inner.clone())
                .then_ignore(just(Token::RightParen))
                .map(|s| format!("$({})", s)),
            just(Token::DollarDoubleParen)
                .ignore_then(inner.clone())
                .then_ignore(just(Token::RightParen))
                .then_ignore(just(Token::RightParen))
                .map(|s| format!("$(({}))", s)),
            filter(|t| {
                !matches!(
                    t,
                    Token::RightParen
                        | Token::LeftParen
                        | Token::DollarParen
                        | Token::DollarDoubleParen
                )
            })
            .map(token_to_safe_string),
        ))
        .repeated()
        .map(join_parts)
    })
    .then_ignore(just(Token::RightParen))
}

fn collect_until_backtick() -> impl Parser<Token, String, Error = Simple<Token>> + Clone {
    filter(|t| !matches!(t, Token::Backtick))
        .repeated()
        .map(|tokens: Vec<Token>| {
            join_parts(tokens.into_iter().map(token_to_safe_string).collect())
        })
        .then_ignore(just(Token::Backtick))
}

fn word_to_string(word: &Word) -> String {
    word.parts
        .iter()
        .map(|p| match p {
            WordPart::Literal(s) | WordPart::SingleQuoted(s) => s.clone(),
            WordPart::Variable(s) => format!("${}", s),
            WordPart::BracedVariable(s) => format!("${{{}}}", s),
            WordPart::Arithmetic(s) => format!("$(({}))", s),
            WordPart::CommandSub(s) => format!("$({})", s),
        })
        .collect()
}

/// Parse input string directly to AST. The input must already be
/// brace-expanded (see [`crate::brace::expand_braces`]).
pub fn parse(input: &str) -> Result<Script, Vec<Simple<Token>>> {
    use crate::lexer::lexer;

    let tokens = lexer().parse(input).map_err(|errs| {
        errs.into_iter()
            .map(|e| Simple::custom(0..0, e.to_string()))
            .collect::<Vec<_>>()
    })?;

    parser().parse(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lexer;

    fn parse_tokens(input: &str) -> Result<Script, Vec<Simple<Token>>> {
        let tokens = lexer().parse(input).unwrap();
        parser().parse(tokens)
    }

    fn statements(input: &str) -> Vec<Statement> {
        parse_tokens(input)
            .unwrap()
            .statements
            .into_iter()
            .filter(|s| !matches!(s, Statement::Empty))
            .collect()
    }

    #[test]
    fn simple_command() {
        let stmts = statements("echo hello");
        assert_eq!(stmts.len(), 1);
        if let Statement::Pipeline(p) = &stmts[0] {
            assert_eq!(p.commands.len(), 1);
            assert_eq!(p.commands[0].name.as_literal(), Some("echo"));
        } else {
            panic!("Expected pipeline");
        }
    }

    #[test]
    fn assignment() {
        let stmts = statements("x=5");
        if let Statement::Assignment(a) = &stmts[0] {
            assert_eq!(a.name, "x");
            assert_eq!(a.value.as_literal(), Some("5"));
        } else {
            panic!("Expected assignment");
        }
    }

    #[test]
    fn pipeline_of_three() {
        let stmts = statements("cat f | grep x | wc -l");
        if let Statement::Pipeline(p) = &stmts[0] {
            assert_eq!(p.commands.len(), 3);
        } else {
            panic!("Expected pipeline");
        }
    }

    #[test]
    fn command_list() {
        let stmts = statements("mkdir d && cd d || echo failed");
        if let Statement::CommandList { first, rest } = &stmts[0] {
            assert_eq!(first.commands[0].name.as_literal(), Some("mkdir"));
            assert_eq!(rest.len(), 2);
            assert_eq!(rest[0].0, ListOp::And);
            assert_eq!(rest[1].0, ListOp::Or);
        } else {
            panic!("Expected command list");
        }
    }

    #[test]
    fn redirections() {
        let stmts = statements("echo hi > out.txt 2>&1");
        if let Statement::Pipeline(p) = &stmts[0] {
            let redirs = &p.commands[0].redirections;
            assert_eq!(redirs.len(), 2);
            assert_eq!(redirs[0].kind, RedirectKind::StdoutWrite);
            assert_eq!(
                redirs[0].target.as_ref().and_then(|w| w.as_literal()),
                Some("out.txt")
            );
            assert_eq!(redirs[1].kind, RedirectKind::StderrToStdout);
            assert!(redirs[1].target.is_none());
        } else {
            panic!("Expected pipeline");
        }
    }

    #[test]
    fn redirect_before_args() {
        // POSIX allows redirections between arguments
        let stmts = statements("grep > out.txt foo");
        if let Statement::Pipeline(p) = &stmts[0] {
            let cmd = &p.commands[0];
            assert_eq!(cmd.args.len(), 1);
            assert_eq!(cmd.redirections.len(), 1);
        } else {
            panic!("Expected pipeline");
        }
    }

    #[test]
    fn if_else() {
        let stmts = statements("if test -f /a; then echo yes; else echo no; fi");
        if let Statement::If(s) = &stmts[0] {
            assert!(s.else_body.is_some());
        } else {
            panic!("Expected if");
        }
    }

    #[test]
    fn for_loop() {
        let stmts = statements("for x in a b c; do echo $x; done");
        if let Statement::For(f) = &stmts[0] {
            assert_eq!(f.variable, "x");
            assert_eq!(f.items.len(), 3);
        } else {
            panic!("Expected for loop");
        }
    }

    #[test]
    fn while_loop() {
        let stmts = statements("while test $i != 3; do i=$((i + 1)); done");
        assert!(matches!(stmts[0], Statement::While(_)));
    }

    #[test]
    fn until_loop() {
        let stmts = statements("until test -f /done; do sleep 1; done");
        assert!(matches!(stmts[0], Statement::Until(_)));
    }

    #[test]
    fn case_statement() {
        let stmts = statements("case $x in a|b) echo ab;; *) echo other;; esac");
        if let Statement::Case(c) = &stmts[0] {
            assert_eq!(c.arms.len(), 2);
            assert_eq!(c.arms[0].patterns.len(), 2);
            assert_eq!(c.arms[1].patterns[0].as_literal(), Some("*"));
        } else {
            panic!("Expected case");
        }
    }

    #[test]
    fn case_multiline() {
        let src = "case $x in\n  a)\n    echo a\n    ;;\n  *)\n    echo other\n    ;;\nesac";
        let stmts = statements(src);
        if let Statement::Case(c) = &stmts[0] {
            assert_eq!(c.arms.len(), 2);
        } else {
            panic!("Expected case");
        }
    }

    #[test]
    fn function_definition() {
        let stmts = statements("greet() { echo hello; }");
        if let Statement::FunctionDef(f) = &stmts[0] {
            assert_eq!(f.name, "greet");
            assert!(!f.body.is_empty());
        } else {
            panic!("Expected function def");
        }
    }

    #[test]
    fn function_keyword_style() {
        let stmts = statements("function greet { echo hello; }");
        assert!(matches!(stmts[0], Statement::FunctionDef(_)));
    }

    #[test]
    fn command_substitution() {
        let stmts = statements("echo $(ls /tmp)");
        if let Statement::Pipeline(p) = &stmts[0] {
            if let WordPart::CommandSub(cmd) = &p.commands[0].args[0].parts[0] {
                assert_eq!(cmd, "ls /tmp");
            } else {
                panic!("Expected command substitution");
            }
        } else {
            panic!("Expected pipeline");
        }
    }

    #[test]
    fn nested_command_substitution() {
        let stmts = statements("echo $(dirname $(pwd))");
        if let Statement::Pipeline(p) = &stmts[0] {
            if let WordPart::CommandSub(cmd) = &p.commands[0].args[0].parts[0] {
                // No space before '$': the re-lex splits on it anyway
                assert_eq!(cmd, "dirname$(pwd)");
            } else {
                panic!("Expected command substitution");
            }
        } else {
            panic!("Expected pipeline");
        }
    }

    #[test]
    fn arithmetic_expansion() {
        let stmts = statements("echo $((1 + 2 * 3))");
        if let Statement::Pipeline(p) = &stmts[0] {
            if let WordPart::Arithmetic(expr) = &p.commands[0].args[0].parts[0] {
                assert_eq!(expr, "1 + 2 * 3");
            } else {
                panic!("Expected arithmetic");
            }
        } else {
            panic!("Expected pipeline");
        }
    }

    #[test]
    fn braced_parameter_with_operator() {
        let stmts = statements("echo ${name:-default}");
        if let Statement::Pipeline(p) = &stmts[0] {
            if let WordPart::BracedVariable(inner) = &p.commands[0].args[0].parts[0] {
                assert!(inner.contains("name"));
            } else {
                panic!("Expected braced variable");
            }
        } else {
            panic!("Expected pipeline");
        }
    }

    #[test]
    fn return_with_value() {
        let stmts = statements("return 3");
        if let Statement::Return(Some(w)) = &stmts[0] {
            assert_eq!(w.as_literal(), Some("3"));
        } else {
            panic!("Expected return with value");
        }
    }

    #[test]
    fn special_variable_arg() {
        let stmts = statements("echo $?");
        if let Statement::Pipeline(p) = &stmts[0] {
            assert_eq!(
                p.commands[0].args[0].parts[0],
                WordPart::Variable("?".to_string())
            );
        } else {
            panic!("Expected pipeline");
        }
    }

    #[test]
    fn multiple_statements() {
        let stmts = statements("echo one; echo two\necho three");
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn parse_error_reported() {
        assert!(parse_tokens("if test -f /a; then echo yes").is_err());
    }
}
