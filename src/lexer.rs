use std::{fmt, io, io::Read, str::Bytes};

use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Eof,
    Def,
    Extern,
    Ident(String),
    Number(f64),
    /// any other single character, operators and punctuation alike
    Char(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Eof => write!(f, "end of input"),
            Token::Def => write!(f, "def"),
            Token::Extern => write!(f, "extern"),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Number(value) => write!(f, "{}", value),
            Token::Char(c) => write!(f, "'{}'", c),
        }
    }
}

lazy_static! {
    // strtod stops at the second '.', so only this prefix of a literal counts
    static ref NUMBER_PREFIX_RE: Regex = Regex::new(r"^[0-9]*(\.[0-9]*)?").unwrap();
}

/// convert the scanned text of a numeric literal, keeping only its longest
/// well formed prefix. no convertible prefix at all reads as zero.
fn parse_number(text: &str) -> f64 {
    NUMBER_PREFIX_RE
        .find(text)
        .and_then(|prefix| prefix.as_str().parse().ok())
        .unwrap_or(0.0)
}

fn is_space(c: u8) -> bool {
    // isspace also counts vertical tab
    c.is_ascii_whitespace() || c == 0x0b
}

/// Pulls bytes out of a reader for the scanner. A read error ends the stream;
/// the error is held until someone asks for it with [`ByteSource::take_error`].
pub struct ByteSource<R> {
    bytes: io::Bytes<R>,
    error: Option<io::Error>,
}

impl<R: Read> ByteSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            bytes: reader.bytes(),
            error: None,
        }
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }
}

impl<R: Read> Iterator for ByteSource<R> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.error.is_some() {
            return None;
        }
        match self.bytes.next()? {
            Ok(byte) => Some(byte),
            Err(err) => {
                self.error = Some(err);
                None
            }
        }
    }
}

/// Turns a stream of bytes into tokens, one call at a time. Holds a single
/// byte of lookahead between calls; `None` in that slot means the input is
/// exhausted.
#[derive(Debug, Clone)]
pub struct Scanner<I> {
    source: I,
    pending: Option<u8>,
}

impl<'a> Scanner<Bytes<'a>> {
    pub fn for_str(input: &'a str) -> Self {
        Self::new(input.bytes())
    }
}

impl<I: Iterator<Item = u8>> Scanner<I> {
    pub fn new(source: I) -> Self {
        Self {
            source,
            pending: Some(b' '),
        }
    }

    pub fn into_source(self) -> I {
        self.source
    }

    fn bump(&mut self) {
        self.pending = self.source.next();
    }

    /// consume bytes while `accept` holds, starting from the pending one
    fn take_while(&mut self, accept: fn(u8) -> bool) -> String {
        let mut buf = String::new();
        while let Some(c) = self.pending.filter(|&c| accept(c)) {
            buf.push(c as char);
            self.bump();
        }
        buf
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            while self.pending.map_or(false, is_space) {
                self.bump();
            }

            let c = match self.pending {
                Some(c) => c,
                None => return Token::Eof,
            };

            if c.is_ascii_alphabetic() {
                let ident = self.take_while(|c| c.is_ascii_alphanumeric());
                return match ident.as_str() {
                    "def" => Token::Def,
                    "extern" => Token::Extern,
                    _ => Token::Ident(ident),
                };
            }

            if c.is_ascii_digit() || c == b'.' {
                let text = self.take_while(|c| c.is_ascii_digit() || c == b'.');
                return Token::Number(parse_number(&text));
            }

            if c == b'#' {
                while self.pending.map_or(false, |c| c != b'\n' && c != b'\r') {
                    self.bump();
                }
                if self.pending.is_none() {
                    return Token::Eof;
                }
                continue;
            }

            self.bump();
            return Token::Char(c as char);
        }
    }
}

/// lex the whole input, leaving off the trailing end of input marker
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut scanner = Scanner::for_str(input);
    std::iter::from_fn(|| match scanner.next_token() {
        Token::Eof => None,
        tok => Some(tok),
    })
    .collect()
}
