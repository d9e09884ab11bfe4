//! Function registry of the template language.
//!
//! Every callable name resolves to a [`Function`] while compiling, so an
//! unknown name or a wrong argument count is reported before any document is
//! rendered.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::value::{TemplateValue, zero_time};
use crate::error::{HalberdError, Result};
use crate::util::levenshtein::damerau_levenshtein_distance;

/// A builtin or helper function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `eq a b...`: true when `a` equals any of the rest
    Eq,
    /// `ne a b`
    Ne,
    /// `lt a b`
    Lt,
    /// `le a b`
    Le,
    /// `gt a b`
    Gt,
    /// `ge a b`
    Ge,
    /// `and a b...`: first falsy argument, else the last
    And,
    /// `or a b...`: first truthy argument, else the last
    Or,
    /// `not a`
    Not,
    /// `len a`
    Len,
    /// Natural logarithm
    Log,
    /// Square root
    Sqrt,
    /// `pow base exp`
    Pow,
    /// Current time
    Now,
    /// Number or numeric string to float, else 0
    ToFloat64,
    /// RFC 3339 string to time, else the zero time
    ToTime,
    /// Damerau-Levenshtein distance of two strings
    Levenshtein,
    /// Division, 0 when dividing by zero
    Div,
    /// Addition
    Add,
    /// Multiplication
    Mul,
}

/// Accepted argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many
    Exact(usize),
    /// At least this many
    AtLeast(usize),
}

const REGISTRY: &[(&str, Function)] = &[
    ("eq", Function::Eq),
    ("ne", Function::Ne),
    ("lt", Function::Lt),
    ("le", Function::Le),
    ("gt", Function::Gt),
    ("ge", Function::Ge),
    ("and", Function::And),
    ("or", Function::Or),
    ("not", Function::Not),
    ("len", Function::Len),
    ("log", Function::Log),
    ("sqrt", Function::Sqrt),
    ("pow", Function::Pow),
    ("now", Function::Now),
    ("toFloat64", Function::ToFloat64),
    ("toTime", Function::ToTime),
    ("levenshtein", Function::Levenshtein),
    ("div", Function::Div),
    ("add", Function::Add),
    ("mul", Function::Mul),
];

impl Function {
    /// Resolve a function by name.
    pub fn lookup(name: &str) -> Option<Function> {
        REGISTRY
            .iter()
            .find(|(registered, _)| *registered == name)
            .map(|(_, function)| *function)
    }

    /// Name the function is registered under.
    pub fn name(&self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(_, function)| function == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }

    /// Accepted argument counts.
    pub fn arity(&self) -> Arity {
        match self {
            Function::Now => Arity::Exact(0),
            Function::Not
            | Function::Len
            | Function::Log
            | Function::Sqrt
            | Function::ToFloat64
            | Function::ToTime => Arity::Exact(1),
            Function::Ne
            | Function::Lt
            | Function::Le
            | Function::Gt
            | Function::Ge
            | Function::Pow
            | Function::Levenshtein
            | Function::Div
            | Function::Add
            | Function::Mul => Arity::Exact(2),
            Function::Eq => Arity::AtLeast(2),
            Function::And | Function::Or => Arity::AtLeast(1),
        }
    }

    /// Reject a call with the wrong number of arguments.
    pub fn check_arity(&self, count: usize) -> Result<()> {
        let ok = match self.arity() {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        };
        if ok {
            Ok(())
        } else {
            let expected = match self.arity() {
                Arity::Exact(n) => format!("{n}"),
                Arity::AtLeast(n) => format!("at least {n}"),
            };
            Err(HalberdError::template(format!(
                "wrong number of args for {}: want {expected} got {count}",
                self.name()
            )))
        }
    }

    /// Whether arguments are evaluated lazily.
    pub fn short_circuits(&self) -> bool {
        matches!(self, Function::And | Function::Or)
    }

    /// Apply the function to evaluated arguments.
    pub fn apply(&self, mut args: Vec<TemplateValue>) -> Result<TemplateValue> {
        self.check_arity(args.len())?;
        let value = match self {
            Function::Eq => {
                let first = args.remove(0);
                TemplateValue::Bool(args.iter().any(|other| values_equal(&first, other)))
            }
            Function::Ne => TemplateValue::Bool(!values_equal(&args[0], &args[1])),
            Function::Lt => TemplateValue::Bool(self.ordered(&args)? == Ordering::Less),
            Function::Le => TemplateValue::Bool(self.ordered(&args)? != Ordering::Greater),
            Function::Gt => TemplateValue::Bool(self.ordered(&args)? == Ordering::Greater),
            Function::Ge => TemplateValue::Bool(self.ordered(&args)? != Ordering::Less),
            Function::And => {
                let last = args.len() - 1;
                let index = args.iter().position(|v| !v.is_truthy()).unwrap_or(last);
                args.swap_remove(index)
            }
            Function::Or => {
                let last = args.len() - 1;
                let index = args.iter().position(TemplateValue::is_truthy).unwrap_or(last);
                args.swap_remove(index)
            }
            Function::Not => TemplateValue::Bool(!args[0].is_truthy()),
            Function::Len => TemplateValue::Int(length(&args[0])? as i64),
            Function::Log => TemplateValue::Float(self.number(&args[0])?.ln()),
            Function::Sqrt => TemplateValue::Float(self.number(&args[0])?.sqrt()),
            Function::Pow => {
                let base = self.number(&args[0])?;
                let exp = self.number(&args[1])?;
                TemplateValue::Float(base.powf(exp))
            }
            Function::Now => TemplateValue::Time(Utc::now()),
            Function::ToFloat64 => TemplateValue::Float(args[0].to_float_lenient()),
            Function::ToTime => TemplateValue::Time(to_time(&args[0])),
            Function::Levenshtein => {
                let a = self.string(&args[0])?;
                let b = self.string(&args[1])?;
                TemplateValue::Int(damerau_levenshtein_distance(a, b) as i64)
            }
            Function::Div => {
                let divisor = args[1].to_float_lenient();
                if divisor == 0.0 {
                    TemplateValue::Float(0.0)
                } else {
                    TemplateValue::Float(args[0].to_float_lenient() / divisor)
                }
            }
            Function::Add => {
                TemplateValue::Float(args[0].to_float_lenient() + args[1].to_float_lenient())
            }
            Function::Mul => {
                TemplateValue::Float(args[0].to_float_lenient() * args[1].to_float_lenient())
            }
        };
        Ok(value)
    }

    fn ordered(&self, args: &[TemplateValue]) -> Result<Ordering> {
        args[0].compare(&args[1]).ok_or_else(|| {
            HalberdError::template(format!(
                "{}: incompatible types for comparison: {} and {}",
                self.name(),
                args[0].kind(),
                args[1].kind()
            ))
        })
    }

    fn number(&self, value: &TemplateValue) -> Result<f64> {
        value.as_number().ok_or_else(|| {
            HalberdError::template(format!(
                "{}: expected a number, got {}",
                self.name(),
                value.kind()
            ))
        })
    }

    fn string<'a>(&self, value: &'a TemplateValue) -> Result<&'a str> {
        match value {
            TemplateValue::Str(s) => Ok(s),
            other => Err(HalberdError::template(format!(
                "{}: expected a string, got {}",
                self.name(),
                other.kind()
            ))),
        }
    }
}

fn values_equal(a: &TemplateValue, b: &TemplateValue) -> bool {
    match (a, b) {
        (TemplateValue::Nil, TemplateValue::Nil) => true,
        _ => a.compare(b) == Some(Ordering::Equal),
    }
}

fn length(value: &TemplateValue) -> Result<usize> {
    match value {
        TemplateValue::Str(s) => Ok(s.chars().count()),
        TemplateValue::Json(serde_json::Value::Array(items)) => Ok(items.len()),
        TemplateValue::Json(serde_json::Value::Object(map)) => Ok(map.len()),
        other => Err(HalberdError::template(format!(
            "len of type {}",
            other.kind()
        ))),
    }
}

fn to_time(value: &TemplateValue) -> DateTime<Utc> {
    match value {
        TemplateValue::Time(t) => *t,
        TemplateValue::Str(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| zero_time()),
        _ => zero_time(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(v: f64) -> TemplateValue {
        TemplateValue::Float(v)
    }

    fn s(v: &str) -> TemplateValue {
        TemplateValue::Str(v.to_string())
    }

    #[test]
    fn test_lookup() {
        assert_eq!(Function::lookup("toFloat64"), Some(Function::ToFloat64));
        assert_eq!(Function::lookup("printf"), None);
        assert_eq!(Function::Levenshtein.name(), "levenshtein");
    }

    #[test]
    fn test_arity() {
        assert!(Function::Now.check_arity(0).is_ok());
        assert!(Function::Add.check_arity(1).is_err());
        assert!(Function::Eq.check_arity(3).is_ok());
        assert!(Function::And.check_arity(0).is_err());
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(Function::Div.apply(vec![f(1.0), f(0.0)]).unwrap(), f(0.0));
        assert_eq!(Function::Div.apply(vec![s("9"), f(3.0)]).unwrap(), f(3.0));
        assert_eq!(
            Function::Add.apply(vec![TemplateValue::Nil, f(2.0)]).unwrap(),
            f(2.0)
        );
        assert_eq!(Function::Mul.apply(vec![f(2.0), TemplateValue::Int(4)]).unwrap(), f(8.0));
        assert_eq!(Function::Pow.apply(vec![f(2.0), f(3.0)]).unwrap(), f(8.0));
        assert!(Function::Sqrt.apply(vec![s("4")]).is_err());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            Function::Eq.apply(vec![s("b"), s("a"), s("b")]).unwrap(),
            TemplateValue::Bool(true)
        );
        assert_eq!(
            Function::Lt.apply(vec![TemplateValue::Int(1), f(1.5)]).unwrap(),
            TemplateValue::Bool(true)
        );
        assert!(Function::Gt.apply(vec![s("a"), f(1.0)]).is_err());
        assert_eq!(
            Function::Ne.apply(vec![s("a"), f(1.0)]).unwrap(),
            TemplateValue::Bool(true)
        );
    }

    #[test]
    fn test_and_or_return_operands() {
        assert_eq!(
            Function::And.apply(vec![f(1.0), s(""), f(2.0)]).unwrap(),
            s("")
        );
        assert_eq!(Function::And.apply(vec![f(1.0), f(2.0)]).unwrap(), f(2.0));
        assert_eq!(Function::Or.apply(vec![s(""), f(3.0)]).unwrap(), f(3.0));
        assert_eq!(
            Function::Or.apply(vec![s(""), TemplateValue::Nil]).unwrap(),
            TemplateValue::Nil
        );
    }

    #[test]
    fn test_time_and_distance() {
        assert_eq!(
            Function::ToTime.apply(vec![s("garbage")]).unwrap(),
            TemplateValue::Time(zero_time())
        );
        assert_eq!(
            Function::Levenshtein.apply(vec![s("ab"), s("ba")]).unwrap(),
            TemplateValue::Int(1)
        );
        assert_eq!(Function::ToFloat64.apply(vec![s("x")]).unwrap(), f(0.0));
    }
}
