//! Abstract Syntax Tree for sandsh scripts
//!
//! This module defines the AST types that represent parsed shell scripts.
//! Function bodies are stored serde-serialized in the shell's function table,
//! so every node derives Serialize/Deserialize.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Empty statement (blank line or comment)
    Empty,
    /// Variable assignment: name=value
    Assignment(Assignment),
    /// Pipeline of commands: cmd1 | cmd2 | ...
    Pipeline(Pipeline),
    /// Pipelines joined by && / ||
    CommandList {
        first: Pipeline,
        rest: Vec<(ListOp, Pipeline)>,
    },
    /// If statement (no elif; chain else-if by nesting)
    If(IfStatement),
    /// For loop
    For(ForLoop),
    /// While loop
    While(WhileLoop),
    /// Until loop
    Until(UntilLoop),
    /// Case statement
    Case(CaseStatement),
    /// Function definition
    FunctionDef(FunctionDef),
    /// Break statement
    Break,
    /// Continue statement
    Continue,
    /// Return statement with optional value
    Return(Option<Word>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub name: String,
    pub value: Word,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub name: Word,
    pub args: Vec<Word>,
    pub redirections: Vec<Redirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub parts: Vec<WordPart>,
}

impl Word {
    pub fn literal(s: &str) -> Self {
        Word {
            parts: vec![WordPart::Literal(s.to_string())],
        }
    }

    pub fn empty() -> Self {
        Word { parts: vec![] }
    }

    /// Get the literal value if this is a simple literal word
    pub fn as_literal(&self) -> Option<&str> {
        if self.parts.len() == 1 {
            if let WordPart::Literal(s) = &self.parts[0] {
                return Some(s);
            }
        }
        None
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                WordPart::Literal(s) | WordPart::SingleQuoted(s) => write!(f, "{}", s)?,
                WordPart::Variable(name) => write!(f, "${}", name)?,
                WordPart::BracedVariable(name) => write!(f, "${{{}}}", name)?,
                WordPart::Arithmetic(expr) => write!(f, "$(({}))", expr)?,
                WordPart::CommandSub(cmd) => write!(f, "$({})", cmd)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WordPart {
    Literal(String),
    SingleQuoted(String),
    Variable(String),
    BracedVariable(String),
    Arithmetic(String),
    CommandSub(String),
}

/// A redirection attached to a command. `2>&1` carries no target word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redirection {
    pub kind: RedirectKind,
    pub target: Option<Word>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedirectKind {
    /// > file (stdout to file, truncate)
    StdoutWrite,
    /// >> file (stdout to file, append)
    StdoutAppend,
    /// < file (stdin from file)
    StdinRead,
    /// 2> file (stderr to file, truncate)
    StderrWrite,
    /// 2>> file (stderr to file, append)
    StderrAppend,
    /// &> file (stdout and stderr to file)
    BothWrite,
    /// 2>&1 (stderr into stdout)
    StderrToStdout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub condition: Box<Pipeline>,
    pub then_body: Vec<Statement>,
    pub else_body: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForLoop {
    pub variable: String,
    pub items: Vec<Word>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileLoop {
    pub condition: Box<Pipeline>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UntilLoop {
    pub condition: Box<Pipeline>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseStatement {
    pub word: Word,
    pub arms: Vec<CaseArm>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseArm {
    pub patterns: Vec<Word>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub body: Vec<Statement>,
}
