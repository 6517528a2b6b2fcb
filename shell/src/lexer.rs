//! Lexer for sandsh scripts
//!
//! Tokenizes shell input into a stream of tokens. Brace expansion has
//! already happened by the time input reaches the lexer (see [`crate::brace`]).

use chumsky::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    Word(String),
    SingleQuoted(String),

    // Operators
    Pipe,      // |
    Semicolon, // ;
    DoubleSemi, // ;;
    Newline,   // \n
    AndAnd,    // &&
    OrOr,      // ||

    // Redirections
    RedirectOut,       // >
    RedirectAppend,    // >>
    RedirectIn,        // <
    RedirectErr,       // 2>
    RedirectErrAppend, // 2>>
    RedirectBoth,      // &>
    RedirectErrToOut,  // 2>&1

    // Brackets
    LeftParen,  // (
    RightParen, // )
    LeftBrace,  // {
    RightBrace, // }

    // Assignment
    Equals, // =

    // Keywords
    If,
    Then,
    Else,
    Fi,
    For,
    In,
    Do,
    Done,
    While,
    Until,
    Case,
    Esac,
    Function,
    Return,
    Break,
    Continue,

    // Special
    Dollar,            // $
    DollarParen,       // $(
    DollarDoubleParen, // $((
    /// `${...}` captured raw, braces balanced. Lexed as one token so
    /// that `#` inside (`${#x}`, `${x##pat}`) is not taken as a comment.
    BracedVariable(String),
    Backtick,          // `
    SpecialVar(String), // $? $# $$ $@ $*

    // Compound word: adjacent bare/quoted segments merged
    // Vec<(is_single_quoted, content)>
    CompoundWord(Vec<(bool, String)>),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Word(s) | Token::SingleQuoted(s) => write!(f, "{}", s),
            Token::Pipe => write!(f, "|"),
            Token::Semicolon => write!(f, ";"),
            Token::DoubleSemi => write!(f, ";;"),
            Token::Newline => write!(f, "\\n"),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::RedirectOut => write!(f, ">"),
            Token::RedirectAppend => write!(f, ">>"),
            Token::RedirectIn => write!(f, "<"),
            Token::RedirectErr => write!(f, "2>"),
            Token::RedirectErrAppend => write!(f, "2>>"),
            Token::RedirectBoth => write!(f, "&>"),
            Token::RedirectErrToOut => write!(f, "2>&1"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::Equals => write!(f, "="),
            Token::If => write!(f, "if"),
            Token::Then => write!(f, "then"),
            Token::Else => write!(f, "else"),
            Token::Fi => write!(f, "fi"),
            Token::For => write!(f, "for"),
            Token::In => write!(f, "in"),
            Token::Do => write!(f, "do"),
            Token::Done => write!(f, "done"),
            Token::While => write!(f, "while"),
            Token::Until => write!(f, "until"),
            Token::Case => write!(f, "case"),
            Token::Esac => write!(f, "esac"),
            Token::Function => write!(f, "function"),
            Token::Return => write!(f, "return"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Dollar => write!(f, "$"),
            Token::DollarParen => write!(f, "$("),
            Token::DollarDoubleParen => write!(f, "$(("),
            Token::BracedVariable(s) => write!(f, "${{{}}}", s),
            Token::Backtick => write!(f, "`"),
            Token::SpecialVar(name) => write!(f, "${}", name),
            Token::CompoundWord(segments) => {
                for (is_sq, s) in segments {
                    if *is_sq {
                        write!(f, "'{}'", s)?;
                    } else {
                        write!(f, "{}", s)?;
                    }
                }
                Ok(())
            }
        }
    }
}

pub fn lexer() -> impl Parser<char, Vec<Token>, Error = Simple<char>> {
    let comment = just('#').then(filter(|c| *c != '\n').repeated()).ignored();

    // Whitespace (not including newlines)
    let ws = filter(|c: &char| *c == ' ' || *c == '\t').repeated();

    // Word segments: bare chars, single-quoted, double-quoted, escaped chars.
    // Adjacent segments (no whitespace between) form a compound word.
    // (bool, String): true = single-quoted (no expansion), false = normal
    let sq_seg = just('\'')
        .ignore_then(filter(|c| *c != '\'').repeated())
        .then_ignore(just('\''))
        .collect::<String>()
        .map(|s| (true, s));

    let dq_seg = just('"')
        .ignore_then(
            just('\\')
                .then(any())
                .map(|(_b, c): (char, char)| match c {
                    // POSIX: these escapes are interpreted inside double quotes
                    '"' => "\"".to_string(),
                    '\\' => "\\".to_string(),
                    '$' => "$".to_string(),
                    '`' => "`".to_string(),
                    '\n' => String::new(), // line continuation
                    // All other \X sequences are literal (backslash preserved)
                    _ => format!("\\{}", c),
                })
                .or(filter(|c: &char| *c != '"' && *c != '\\').map(|c: char| c.to_string()))
                .repeated(),
        )
        .then_ignore(just('"'))
        .map(|parts: Vec<String>| (false, parts.concat()));

    // Keywords
    let keyword = choice((
        text::keyword("if").to(Token::If),
        text::keyword("then").to(Token::Then),
        text::keyword("else").to(Token::Else),
        text::keyword("fi").to(Token::Fi),
        text::keyword("for").to(Token::For),
        text::keyword("in").to(Token::In),
        text::keyword("do").to(Token::Do),
        text::keyword("done").to(Token::Done),
        text::keyword("while").to(Token::While),
        text::keyword("until").to(Token::Until),
        text::keyword("case").to(Token::Case),
        text::keyword("esac").to(Token::Esac),
        text::keyword("function").to(Token::Function),
        text::keyword("return").to(Token::Return),
        text::keyword("break").to(Token::Break),
        text::keyword("continue").to(Token::Continue),
    ));

    // ${...} captured raw with balanced braces; its body is parsed by
    // the parameter-expansion code, not the lexer.
    let braced_var = just("${")
        .ignore_then(recursive(|inner| {
            choice((
                just('{')
                    .ignore_then(inner)
                    .then_ignore(just('}'))
                    .map(|s: String| format!("{{{}}}", s)),
                filter(|c: &char| *c != '{' && *c != '}').map(|c: char| c.to_string()),
            ))
            .repeated()
            .map(|parts: Vec<String>| parts.concat())
        }))
        .then_ignore(just('}'))
        .map(Token::BracedVariable);

    // Multi-character operators (must come before single-char versions)
    let multi_op = choice((
        just("$((").to(Token::DollarDoubleParen),
        just("$(").to(Token::DollarParen),
        just("$?").to(Token::SpecialVar("?".to_string())),
        just("$#").to(Token::SpecialVar("#".to_string())),
        just("$$").to(Token::SpecialVar("$".to_string())),
        just("$@").to(Token::SpecialVar("@".to_string())),
        just("$*").to(Token::SpecialVar("*".to_string())),
        just("&&").to(Token::AndAnd),
        just("||").to(Token::OrOr),
        just("2>&1").to(Token::RedirectErrToOut),
        just("2>>").to(Token::RedirectErrAppend),
        just("2>").to(Token::RedirectErr),
        just(">>").to(Token::RedirectAppend),
        just("&>").to(Token::RedirectBoth),
        just(";;").to(Token::DoubleSemi),
    ));

    let single_op = choice((
        just('|').to(Token::Pipe),
        just(';').to(Token::Semicolon),
        just('>').to(Token::RedirectOut),
        just('<').to(Token::RedirectIn),
        just('(').to(Token::LeftParen),
        just(')').to(Token::RightParen),
        just('{').to(Token::LeftBrace),
        just('}').to(Token::RightBrace),
        just('[').to(Token::Word("[".to_string())),
        just(']').to(Token::Word("]".to_string())),
        just("==").to(Token::Word("==".to_string())),
        just("!=").to(Token::Word("!=".to_string())),
        just('=').to(Token::Equals),
        just('$').to(Token::Dollar),
        just('\n').to(Token::Newline),
        just('`').to(Token::Backtick),
    ));

    let word_char = filter(|c: &char| {
        !c.is_whitespace()
            && !matches!(
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

    // Backslash-escape outside quotes: \X -> literal X (POSIX)
    // \<newline> -> line continuation (empty)
    let escaped_char = just('\\')
        .ignore_then(any())
        .map(|c: char| if c == '\n' { String::new() } else { c.to_string() });

    let bare_seg = escaped_char
        .or(word_char.map(|c: char| c.to_string()))
        .repeated()
        .at_least(1)
        .map(|parts| (false, parts.concat()));

    // Compound word: one or more adjacent segments (bare, single-quoted,
    // double-quoted) with no whitespace between them.
    let compound_word = choice((bare_seg, sq_seg, dq_seg))
        .repeated()
        .at_least(1)
        .map(|segments: Vec<(bool, String)>| {
            if segments.len() == 1 {
                let (is_sq, s) = segments.into_iter().next().unwrap();
                if is_sq {
                    Token::SingleQuoted(s)
                } else {
                    Token::Word(s)
                }
            } else {
                Token::CompoundWord(segments)
            }
        });

    let token = choice((braced_var, multi_op, single_op, keyword, compound_word));

    // Skip comments and whitespace between tokens. A trailing comment
    // (or a comment-only input) leaves no token behind, so consume it
    // explicitly before end-of-input.
    token
        .padded_by(comment.repeated())
        .padded_by(ws)
        .repeated()
        .then_ignore(ws)
        .then_ignore(comment.or_not())
        .then_ignore(end())
}
