use std::{collections::HashMap, str::FromStr};

use super::lexer::Token;

/// The operators every table starts out with. Higher binds tighter.
pub const DEFAULT_BINOPS: [(char, i32); 7] = [
    ('<', 10),
    ('+', 20),
    ('-', 20),
    ('/', 40),
    ('*', 40),
    ('%', 40),
    ('^', 50),
];

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum PrecedenceError {
    #[error("'{0}' cannot be used as a binary operator")]
    InvalidOperator(char),
    #[error("precedence of '{0}' must be positive, got {1}")]
    NonPositive(char, i32),
    #[error("malformed operator binding {0:?}, expected OP=PRECEDENCE")]
    Malformed(String),
}

/// An operator and its precedence, as written `OP=PRECEDENCE`.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Binding {
    pub op: char,
    pub precedence: i32,
}

impl FromStr for Binding {
    type Err = PrecedenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PrecedenceError::Malformed(s.to_string());
        let mut chars = s.chars();
        let op = chars.next().ok_or_else(malformed)?;
        let precedence = chars
            .as_str()
            .strip_prefix('=')
            .and_then(|prec| prec.trim().parse().ok())
            .ok_or_else(malformed)?;
        Ok(Binding { op, precedence })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct PrecedenceTable {
    binops: HashMap<char, i32>,
}

impl std::default::Default for PrecedenceTable {
    fn default() -> Self {
        Self {
            binops: DEFAULT_BINOPS.iter().copied().collect(),
        }
    }
}

impl PrecedenceTable {
    /// a table with no operators at all; every token is then a non-operator
    pub fn empty() -> Self {
        Self {
            binops: HashMap::new(),
        }
    }

    /// Bind `op` at `precedence`, replacing any earlier binding. Characters the
    /// scanner or grammar already give a meaning to are refused.
    pub fn install(&mut self, op: char, precedence: i32) -> Result<(), PrecedenceError> {
        if !op.is_ascii_punctuation() || "(),;#.".contains(op) {
            return Err(PrecedenceError::InvalidOperator(op));
        }
        if precedence <= 0 {
            return Err(PrecedenceError::NonPositive(op, precedence));
        }
        self.binops.insert(op, precedence);
        Ok(())
    }

    pub fn install_binding(&mut self, binding: Binding) -> Result<(), PrecedenceError> {
        self.install(binding.op, binding.precedence)
    }

    /// precedence of `token` as a binary operator, or -1 when it is not one
    pub fn precedence(&self, token: &Token) -> i32 {
        match token {
            Token::Char(c) if c.is_ascii() => match self.binops.get(c) {
                Some(&prec) if prec > 0 => prec,
                _ => -1,
            },
            _ => -1,
        }
    }
}
