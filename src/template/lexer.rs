//! Lexer for template source text.
//!
//! The lexer splits the source into verbatim text and the tokens of each
//! `{{ ... }}` action. Trim markers (`{{- ` and ` -}}`) are resolved here by
//! trimming the neighbouring text items, so the parser never sees them.

use crate::error::{HalberdError, Result};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const TRIM_CLOSE: &str = "-}}";

/// A lexical item.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// Verbatim text outside actions
    Text(String),
    /// Start of an action
    Open,
    /// End of an action
    Close,
    /// A `/* ... */` comment action body
    Comment,
    /// Function name or keyword
    Ident(String),
    /// `.` or a `.a.b` field chain
    Field(Vec<String>),
    /// `$` or a `$.a.b` field chain
    Variable(Vec<String>),
    /// Number literal, validated by the parser
    Number(String),
    /// Interpreted or raw string literal
    Str(String),
    /// `true` or `false`
    Bool(bool),
    /// `nil`
    Nil,
    /// `|`
    Pipe,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
}

/// Tokenize template source.
pub fn lex(source: &str) -> Result<Vec<Item>> {
    let mut lexer = Lexer {
        src: source,
        pos: 0,
        items: Vec::new(),
        trims: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.finish())
}

/// Trim requests recorded while lexing, keyed by item index.
#[derive(Debug, Clone, Copy)]
enum Trim {
    /// Trim the end of the text item before this index
    Before(usize),
    /// Trim the start of the text item after this index
    After(usize),
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    items: Vec<Item>,
    trims: Vec<Trim>,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl<'a> Lexer<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn run(&mut self) -> Result<()> {
        while self.pos < self.src.len() {
            match self.rest().find(OPEN) {
                Some(offset) => {
                    if offset > 0 {
                        let text = self.rest()[..offset].to_string();
                        self.items.push(Item::Text(text));
                    }
                    self.pos += offset + OPEN.len();
                    self.lex_action()?;
                }
                None => {
                    self.items.push(Item::Text(self.rest().to_string()));
                    self.pos = self.src.len();
                }
            }
        }
        Ok(())
    }

    fn lex_action(&mut self) -> Result<()> {
        if self.peek() == Some('-') && self.peek_second().is_some_and(char::is_whitespace) {
            self.bump();
            self.trims.push(Trim::Before(self.items.len()));
        }
        self.items.push(Item::Open);
        self.skip_whitespace();

        if self.rest().starts_with("/*") {
            let end = self
                .rest()
                .find("*/")
                .ok_or_else(|| HalberdError::template("unclosed comment"))?;
            self.pos += end + 2;
            self.items.push(Item::Comment);
            self.skip_whitespace();
            return self.lex_close();
        }

        loop {
            self.skip_whitespace();
            if self.rest().starts_with(CLOSE) || self.rest().starts_with(TRIM_CLOSE) {
                return self.lex_close();
            }
            let c = self
                .peek()
                .ok_or_else(|| HalberdError::template("unclosed action"))?;
            match c {
                '|' => {
                    self.bump();
                    self.items.push(Item::Pipe);
                }
                '(' => {
                    self.bump();
                    self.items.push(Item::LeftParen);
                }
                ')' => {
                    self.bump();
                    self.items.push(Item::RightParen);
                }
                '"' => self.lex_quoted()?,
                '`' => self.lex_raw()?,
                '.' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),
                '.' => {
                    let path = self.lex_path();
                    if path.is_empty() {
                        self.bump();
                    }
                    self.items.push(Item::Field(path));
                }
                '$' => {
                    self.bump();
                    let path = self.lex_path();
                    self.items.push(Item::Variable(path));
                }
                '-' | '+' if self.peek_second().is_some_and(|c| c.is_ascii_digit() || c == '.') => {
                    self.lex_number()
                }
                c if c.is_ascii_digit() => self.lex_number(),
                c if is_ident_start(c) => self.lex_ident(),
                other => {
                    return Err(HalberdError::template(format!(
                        "unexpected {other:?} in action"
                    )));
                }
            }
        }
    }

    fn lex_close(&mut self) -> Result<()> {
        if self.rest().starts_with(TRIM_CLOSE) {
            self.pos += TRIM_CLOSE.len();
            self.items.push(Item::Close);
            self.trims.push(Trim::After(self.items.len() - 1));
            Ok(())
        } else if self.rest().starts_with(CLOSE) {
            self.pos += CLOSE.len();
            self.items.push(Item::Close);
            Ok(())
        } else {
            Err(HalberdError::template("unclosed action"))
        }
    }

    /// Consume a `(.ident)*` chain.
    fn lex_path(&mut self) -> Vec<String> {
        let mut path = Vec::new();
        while self.peek() == Some('.') && self.peek_second().is_some_and(is_ident_start) {
            self.bump();
            let start = self.pos;
            while self.peek().is_some_and(is_ident_char) {
                self.bump();
            }
            path.push(self.src[start..self.pos].to_string());
        }
        path
    }

    fn lex_ident(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        let word = &self.src[start..self.pos];
        let item = match word {
            "true" => Item::Bool(true),
            "false" => Item::Bool(false),
            "nil" => Item::Nil,
            _ => Item::Ident(word.to_string()),
        };
        self.items.push(item);
    }

    fn lex_number(&mut self) {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        let mut prev = ' ';
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '-' || c == '+') && (prev == 'e' || prev == 'E');
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign {
                prev = c;
                self.bump();
            } else {
                break;
            }
        }
        self.items
            .push(Item::Number(self.src[start..self.pos].to_string()));
    }

    fn lex_quoted(&mut self) -> Result<()> {
        self.bump();
        let mut value = String::new();
        loop {
            let c = self
                .bump()
                .ok_or_else(|| HalberdError::template("unterminated quoted string"))?;
            match c {
                '"' => break,
                '\\' => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| HalberdError::template("unterminated quoted string"))?;
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '\\' => '\\',
                        '"' => '"',
                        '\'' => '\'',
                        other => {
                            return Err(HalberdError::template(format!(
                                "unknown escape sequence \\{other}"
                            )));
                        }
                    });
                }
                '\n' => return Err(HalberdError::template("unterminated quoted string")),
                other => value.push(other),
            }
        }
        self.items.push(Item::Str(value));
        Ok(())
    }

    fn lex_raw(&mut self) -> Result<()> {
        self.bump();
        let end = self
            .rest()
            .find('`')
            .ok_or_else(|| HalberdError::template("unterminated raw quoted string"))?;
        let value = self.rest()[..end].to_string();
        self.pos += end + 1;
        self.items.push(Item::Str(value));
        Ok(())
    }

    fn finish(mut self) -> Vec<Item> {
        for trim in std::mem::take(&mut self.trims) {
            match trim {
                Trim::Before(open) => {
                    if let Some(Item::Text(text)) = open.checked_sub(1).and_then(|i| self.items.get_mut(i)) {
                        let trimmed = text.trim_end().len();
                        text.truncate(trimmed);
                    }
                }
                Trim::After(close) => {
                    if let Some(Item::Text(text)) = self.items.get_mut(close + 1) {
                        *text = text.trim_start().to_string();
                    }
                }
            }
        }
        self.items
            .into_iter()
            .filter(|item| !matches!(item, Item::Text(text) if text.is_empty()))
            .collect()
    }
}
