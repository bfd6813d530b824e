use std::{
    fmt,
    io::{self, Write},
};

use super::{
    ast::{ASTNode, Function, Prototype},
    lexer::Token,
    parser::{ParseError, Parser},
};

/// Everything the driver reports while it works through the input.
#[derive(Debug, PartialEq, Clone)]
pub enum Event {
    Prompt,
    Definition(Function),
    Extern(Prototype),
    TopLevelExpr(Function),
    Error(ParseError),
}

impl Event {
    /// the parsed node, for events that carry one
    pub fn node(&self) -> Option<ASTNode> {
        match self {
            Event::Definition(func) | Event::TopLevelExpr(func) => {
                Some(ASTNode::Function(func.clone()))
            }
            Event::Extern(proto) => Some(ASTNode::Extern(proto.clone())),
            Event::Prompt | Event::Error(_) => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Prompt => write!(f, "ready> "),
            Event::Definition(_) => write!(f, "Parsed a function definition."),
            Event::Extern(_) => write!(f, "Parsed an extern"),
            Event::TopLevelExpr(_) => write!(f, "Parsed a top-level expr"),
            Event::Error(err) => write!(f, "Error: {}", err),
        }
    }
}

pub trait Diagnostics {
    fn report(&mut self, event: Event) -> io::Result<()>;
}

/// Writes events out as text, one per line except for prompts.
pub struct WriterSink<W> {
    writer: W,
    pub quiet: bool,
    pub dump_ast: bool,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            quiet: false,
            dump_ast: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Diagnostics for WriterSink<W> {
    fn report(&mut self, event: Event) -> io::Result<()> {
        if let Event::Prompt = event {
            if !self.quiet {
                write!(self.writer, "{}", event)?;
                self.writer.flush()?;
            }
            return Ok(());
        }

        writeln!(self.writer, "{}", event)?;
        if self.dump_ast {
            if let Some(node) = event.node() {
                writeln!(self.writer, "{}", node)?;
            }
        }
        Ok(())
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Recorder {
    /// the recorded lines, prompts left out
    pub fn messages(&self) -> Vec<String> {
        self.events
            .iter()
            .filter(|event| **event != Event::Prompt)
            .map(ToString::to_string)
            .collect()
    }
}

impl Diagnostics for Recorder {
    fn report(&mut self, event: Event) -> io::Result<()> {
        self.events.push(event);
        Ok(())
    }
}

/// Runs the read-parse-report loop over a whole input, recovering from parse
/// errors by skipping a single token.
pub struct Driver<I, D> {
    parser: Parser<I>,
    diagnostics: D,
}

impl<I: Iterator<Item = u8>, D: Diagnostics> Driver<I, D> {
    pub fn new(parser: Parser<I>, diagnostics: D) -> Self {
        Self {
            parser,
            diagnostics,
        }
    }

    pub fn into_parts(self) -> (Parser<I>, D) {
        (self.parser, self.diagnostics)
    }

    /// Loop until the input runs out. Only a failing diagnostics sink stops it
    /// early.
    pub fn run(&mut self) -> io::Result<()> {
        self.diagnostics.report(Event::Prompt)?;
        self.parser.advance();

        loop {
            self.diagnostics.report(Event::Prompt)?;
            let outcome = match self.parser.current() {
                Token::Eof => return Ok(()),
                Token::Char(';') => {
                    self.parser.advance();
                    continue;
                }
                Token::Def => self.parser.parse_definition().map(Event::Definition),
                Token::Extern => self.parser.parse_extern().map(Event::Extern),
                _ => self.parser.parse_top_level_expr().map(Event::TopLevelExpr),
            };

            match outcome {
                Ok(event) => self.diagnostics.report(event)?,
                Err(err) => {
                    self.diagnostics.report(Event::Error(err))?;
                    self.parser.advance();
                }
            }
        }
    }
}
