//! S-expression reading: one textual term in, one [`Value`] out.
//!
//! The reader is a recursive descent over a single left-to-right cursor with
//! one character of lookahead; nom supplies the lexical layer (whitespace
//! and character-run scanning). Lists may be proper or dotted, numbers are
//! bare digit runs, `#t`/`#f` are the booleans, and a symbol is any other
//! run of characters excluding whitespace and parentheses.
//!
//! Known bug, kept deliberately: a string literal scans ahead to the next
//! `"` to decide how many characters to consume, but the constructed value
//! wraps the *entire original source text*, and the closing quote is left
//! unconsumed (so a quoted string at top level fails the trailing-content
//! check). Downstream tests pin this behavior; do not fix it silently.

use nom::Parser;
use nom::bytes::complete::take_while;
use nom::character::complete::multispace0;

use crate::value::{Heap, Value};
use crate::{Error, MAX_READ_DEPTH, ParseError, ParseErrorKind};

type NomError<'a> = nom::error::Error<&'a str>;

/// Parse a single top-level term from `input`, allocating pairs in `heap`.
///
/// Fails with a [`ParseError`] if the term is malformed, a list is
/// unterminated, a `)` appears where a term was expected, or non-whitespace
/// input remains after the term.
pub fn read(heap: &mut Heap, input: &str) -> Result<Value, Error> {
    let mut reader = Reader {
        src: input,
        rest: input,
        heap,
    };
    let term = reader.read_term(0)?;

    reader.skip_whitespace();
    if !reader.rest.is_empty() {
        let found: String = reader.rest.chars().take(10).collect();
        return Err(reader.err_found(
            ParseErrorKind::TrailingContent,
            "unexpected input after expression",
            found,
        ));
    }

    Ok(term)
}

/// Characters that may appear in a symbol (and in the word after `#`):
/// everything except whitespace and parentheses.
fn is_symbol_char(c: char) -> bool {
    !c.is_whitespace() && c != '(' && c != ')'
}

struct Reader<'a, 'h> {
    /// The complete original input, kept for error context (and for the
    /// string-literal bug, which captures it wholesale).
    src: &'a str,
    /// Unconsumed remainder of the input.
    rest: &'a str,
    heap: &'h mut Heap,
}

impl<'a> Reader<'a, '_> {
    fn offset(&self) -> usize {
        self.src.len() - self.rest.len()
    }

    fn err(&self, kind: ParseErrorKind, message: impl Into<String>) -> Error {
        Error::Parse(ParseError::with_context(
            kind,
            message,
            self.src,
            self.offset(),
        ))
    }

    fn err_found(
        &self,
        kind: ParseErrorKind,
        message: impl Into<String>,
        found: impl Into<String>,
    ) -> Error {
        Error::Parse(ParseError::with_context_and_found(
            kind,
            message,
            self.src,
            self.offset(),
            Some(found.into()),
        ))
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    /// Advance the cursor past one character.
    fn bump(&mut self) {
        let mut chars = self.rest.chars();
        chars.next();
        self.rest = chars.as_str();
    }

    fn skip_whitespace(&mut self) {
        if let Ok((rest, _)) = multispace0::<&str, NomError<'a>>(self.rest) {
            self.rest = rest;
        }
    }

    /// Consume a maximal run of characters satisfying `cond` (possibly empty).
    fn take_run(&mut self, cond: fn(char) -> bool) -> &'a str {
        match take_while::<_, &str, NomError<'a>>(cond).parse(self.rest) {
            Ok((rest, run)) => {
                self.rest = rest;
                run
            }
            // take_while cannot fail; leave the cursor untouched if it ever does.
            Err(_) => "",
        }
    }

    fn read_term(&mut self, depth: usize) -> Result<Value, Error> {
        if depth >= MAX_READ_DEPTH {
            return Err(self.err(
                ParseErrorKind::TooDeeplyNested,
                format!("expression too deeply nested (max depth: {MAX_READ_DEPTH})"),
            ));
        }

        self.skip_whitespace();
        match self.peek() {
            None => Err(self.err(
                ParseErrorKind::Incomplete,
                "expected an expression, found end of input",
            )),
            Some('(') => {
                self.bump();
                self.read_list(depth + 1)
            }
            Some(')') => Err(self.err_found(
                ParseErrorKind::InvalidSyntax,
                "unexpected ')'",
                ")",
            )),
            Some('#') => {
                self.bump();
                self.read_sharp()
            }
            Some(c) if c.is_ascii_digit() => self.read_number(),
            Some('"') => {
                self.bump();
                self.read_string()
            }
            Some(_) => self.read_symbol(),
        }
    }

    fn read_sharp(&mut self) -> Result<Value, Error> {
        match self.take_run(is_symbol_char) {
            "t" => Ok(Value::Bool(true)),
            "f" => Ok(Value::Bool(false)),
            word => Err(self.err_found(
                ParseErrorKind::InvalidSyntax,
                "unknown '#' literal",
                format!("#{word}"),
            )),
        }
    }

    fn read_number(&mut self) -> Result<Value, Error> {
        let digits = self.take_run(|c| c.is_ascii_digit());
        match digits.parse::<f64>() {
            Ok(n) => Ok(Value::Number(n)),
            Err(_) => Err(self.err_found(
                ParseErrorKind::InvalidSyntax,
                "malformed number literal",
                digits,
            )),
        }
    }

    fn read_string(&mut self) -> Result<Value, Error> {
        // Known bug: scan to the closing quote to decide how far to advance,
        // but wrap the whole source text and leave the quote unconsumed.
        let span = self.rest.find('"').unwrap_or(self.rest.len());
        self.rest = &self.rest[span..];
        Ok(Value::String(self.src.to_owned()))
    }

    fn read_symbol(&mut self) -> Result<Value, Error> {
        let word = self.take_run(is_symbol_char);
        if word.is_empty() {
            // Unreachable via read_term's dispatch, but an empty symbol must
            // be diagnosed rather than silently produced.
            return Err(self.err(ParseErrorKind::InvalidSyntax, "expected an expression"));
        }
        Ok(Value::Symbol(word.to_owned()))
    }

    /// Read list elements after the opening `(`. A `.` after at least one
    /// element reads a single tail term and requires `)` right after it.
    fn read_list(&mut self, depth: usize) -> Result<Value, Error> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    return Err(self.err(ParseErrorKind::Incomplete, "unterminated list"));
                }
                Some(')') => {
                    self.bump();
                    return Ok(self.heap.list(&items));
                }
                Some('.') if !items.is_empty() => {
                    self.bump();
                    let tail = self.read_term(depth)?;
                    self.expect_close()?;
                    return Ok(self.heap.list_with_tail(&items, tail));
                }
                Some(_) => items.push(self.read_term(depth)?),
            }
        }
    }

    fn expect_close(&mut self) -> Result<(), Error> {
        self.skip_whitespace();
        match self.peek() {
            Some(')') => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.err_found(
                ParseErrorKind::InvalidSyntax,
                "expected ')' after dotted tail",
                c.to_string(),
            )),
            None => Err(self.err(
                ParseErrorKind::Incomplete,
                "expected ')' after dotted tail, found end of input",
            )),
        }
    }
}
