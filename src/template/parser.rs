//! Parser that compiles lexical items into an expression tree.
//!
//! Pipelines are folded into nested calls while parsing: `x | f a` becomes
//! the call `f a x`, so execution only ever sees [`Expr::Call`] nodes.

use super::functions::Function;
use super::lexer::Item;
use super::value::TemplateValue;
use crate::error::{HalberdError, Result};

/// Actions that exist in the full language but are not supported here.
const UNSUPPORTED_KEYWORDS: &[&str] = &["range", "with", "define", "template", "block", "break", "continue"];

/// A compiled template node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Verbatim text
    Text(String),
    /// `{{ pipeline }}`, printed
    Action(Expr),
    /// `{{ if }}` chain with its `else if` branches and optional `else`
    If {
        /// Condition and body per branch, in order
        branches: Vec<(Expr, Vec<Node>)>,
        /// Body of the trailing `else`, empty when absent
        otherwise: Vec<Node>,
    },
}

/// A compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal(TemplateValue),
    /// Field chain from the root; empty for the root itself
    Field(Vec<String>),
    /// Function call with its arguments, piped value last
    Call {
        /// Resolved function
        function: Function,
        /// Argument expressions
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Eof,
    Else,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delim {
    Close,
    Paren,
}

enum Operand {
    Name(String),
    Expr(Expr),
}

/// Parse lexical items into template nodes.
pub fn parse(items: Vec<Item>) -> Result<Vec<Node>> {
    let mut parser = Parser {
        items: items.into_iter().peekable(),
    };
    let (nodes, terminator) = parser.parse_list()?;
    match terminator {
        Terminator::Eof => Ok(nodes),
        Terminator::Else => Err(HalberdError::template("unexpected {{else}}")),
        Terminator::End => Err(HalberdError::template("unexpected {{end}}")),
    }
}

struct Parser {
    items: std::iter::Peekable<std::vec::IntoIter<Item>>,
}

fn unexpected(item: Option<Item>, context: &str) -> HalberdError {
    match item {
        Some(item) => HalberdError::template(format!("unexpected {item:?} in {context}")),
        None => HalberdError::template(format!("unexpected EOF in {context}")),
    }
}

impl Parser {
    fn peek_ident(&mut self) -> Option<&str> {
        match self.items.peek() {
            Some(Item::Ident(word)) => Some(word.as_str()),
            _ => None,
        }
    }

    fn expect_close(&mut self) -> Result<()> {
        match self.items.next() {
            Some(Item::Close) => Ok(()),
            other => Err(unexpected(other, "action")),
        }
    }

    fn parse_list(&mut self) -> Result<(Vec<Node>, Terminator)> {
        let mut nodes = Vec::new();
        loop {
            match self.items.next() {
                None => return Ok((nodes, Terminator::Eof)),
                Some(Item::Text(text)) => nodes.push(Node::Text(text)),
                Some(Item::Open) => {
                    if matches!(self.items.peek(), Some(Item::Comment)) {
                        self.items.next();
                        self.expect_close()?;
                        continue;
                    }
                    let keyword = self.peek_ident().map(str::to_string);
                    match keyword.as_deref() {
                        Some("if") => {
                            self.items.next();
                            nodes.push(self.parse_if()?);
                        }
                        Some("else") => {
                            self.items.next();
                            return Ok((nodes, Terminator::Else));
                        }
                        Some("end") => {
                            self.items.next();
                            self.expect_close()?;
                            return Ok((nodes, Terminator::End));
                        }
                        Some(word) if UNSUPPORTED_KEYWORDS.contains(&word) => {
                            return Err(HalberdError::template(format!(
                                "unsupported action {{{{{word}}}}}"
                            )));
                        }
                        _ => {
                            let expr = self.parse_pipeline(Delim::Close)?;
                            nodes.push(Node::Action(expr));
                        }
                    }
                }
                other => return Err(unexpected(other, "template")),
            }
        }
    }

    fn parse_if(&mut self) -> Result<Node> {
        let mut branches = Vec::new();
        loop {
            let condition = self.parse_pipeline(Delim::Close)?;
            let (body, terminator) = self.parse_list()?;
            branches.push((condition, body));
            match terminator {
                Terminator::End => {
                    return Ok(Node::If {
                        branches,
                        otherwise: Vec::new(),
                    });
                }
                Terminator::Eof => return Err(HalberdError::template("unexpected EOF in if")),
                Terminator::Else => {
                    if self.peek_ident() == Some("if") {
                        self.items.next();
                        continue;
                    }
                    self.expect_close()?;
                    let (otherwise, terminator) = self.parse_list()?;
                    return match terminator {
                        Terminator::End => Ok(Node::If {
                            branches,
                            otherwise,
                        }),
                        Terminator::Else => {
                            Err(HalberdError::template("expected {{end}}; found {{else}}"))
                        }
                        Terminator::Eof => Err(HalberdError::template("unexpected EOF in else")),
                    };
                }
            }
        }
    }

    fn parse_pipeline(&mut self, delim: Delim) -> Result<Expr> {
        let mut piped: Option<Expr> = None;
        let mut stage = 1;
        loop {
            let command = self.parse_command()?;
            piped = Some(compile_command(command, piped, stage)?);
            match self.items.next() {
                Some(Item::Pipe) => stage += 1,
                Some(Item::Close) if delim == Delim::Close => break,
                Some(Item::RightParen) if delim == Delim::Paren => break,
                other => return Err(unexpected(other, "pipeline")),
            }
        }
        piped.ok_or_else(|| HalberdError::template("missing value for command"))
    }

    fn parse_command(&mut self) -> Result<Vec<Operand>> {
        let mut operands = Vec::new();
        loop {
            if matches!(
                self.items.peek(),
                None | Some(Item::Pipe | Item::Close | Item::RightParen)
            ) {
                break;
            }
            let operand = match self.items.next() {
                Some(Item::Ident(name)) => Operand::Name(name),
                Some(Item::Field(path)) | Some(Item::Variable(path)) => {
                    Operand::Expr(Expr::Field(path))
                }
                Some(Item::Number(text)) => Operand::Expr(Expr::Literal(parse_number(&text)?)),
                Some(Item::Str(text)) => Operand::Expr(Expr::Literal(TemplateValue::Str(text))),
                Some(Item::Bool(b)) => Operand::Expr(Expr::Literal(TemplateValue::Bool(b))),
                Some(Item::Nil) => Operand::Expr(Expr::Literal(TemplateValue::Nil)),
                Some(Item::LeftParen) => Operand::Expr(self.parse_pipeline(Delim::Paren)?),
                other => return Err(unexpected(other, "command")),
            };
            operands.push(operand);
        }
        if operands.is_empty() {
            return Err(HalberdError::template("missing value for command"));
        }
        Ok(operands)
    }

}

fn compile_command(operands: Vec<Operand>, piped: Option<Expr>, stage: usize) -> Result<Expr> {
    let mut operands = operands.into_iter();
    match operands.next() {
        Some(Operand::Name(name)) => {
            let function = resolve(&name)?;
            let mut args = operands.map(operand_expr).collect::<Result<Vec<_>>>()?;
            args.extend(piped);
            function.check_arity(args.len())?;
            Ok(Expr::Call { function, args })
        }
        Some(Operand::Expr(expr)) => {
            if operands.next().is_some() {
                return Err(HalberdError::template("can't give argument to non-function"));
            }
            if piped.is_some() {
                return Err(HalberdError::template(format!(
                    "non executable command in pipeline stage {stage}"
                )));
            }
            Ok(expr)
        }
        None => Err(HalberdError::template("missing value for command")),
    }
}

fn resolve(name: &str) -> Result<Function> {
    Function::lookup(name)
        .ok_or_else(|| HalberdError::template(format!("function \"{name}\" not defined")))
}

/// A bare function name in argument position is a call without arguments.
fn operand_expr(operand: Operand) -> Result<Expr> {
    match operand {
        Operand::Expr(expr) => Ok(expr),
        Operand::Name(name) => {
            let function = resolve(&name)?;
            function.check_arity(0)?;
            Ok(Expr::Call {
                function,
                args: Vec::new(),
            })
        }
    }
}

fn parse_number(text: &str) -> Result<TemplateValue> {
    let cleaned = text.replace('_', "");
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        if let Ok(value) = i64::from_str_radix(hex, 16) {
            return Ok(TemplateValue::Int(if negative { -value } else { value }));
        }
    } else if let Ok(value) = cleaned.parse::<i64>() {
        return Ok(TemplateValue::Int(value));
    } else if let Ok(value) = cleaned.parse::<f64>() {
        if value.is_finite() {
            return Ok(TemplateValue::Float(value));
        }
    }
    Err(HalberdError::template(format!("bad number syntax: {text:?}")))
}
