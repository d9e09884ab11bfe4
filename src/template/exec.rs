//! Execution of compiled templates against a JSON object.

use serde_json::Value;

use super::parser::{Expr, Node};
use super::value::TemplateValue;
use crate::document::Document;
use crate::error::Result;

/// Render nodes into `out`, reading fields from `root`.
pub fn render_nodes(nodes: &[Node], root: &Document, out: &mut String) -> Result<()> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Action(expr) => {
                let value = eval(expr, root)?;
                out.push_str(&value.to_string());
            }
            Node::If {
                branches,
                otherwise,
            } => {
                let mut taken = false;
                for (condition, body) in branches {
                    if eval(condition, root)?.is_truthy() {
                        render_nodes(body, root, out)?;
                        taken = true;
                        break;
                    }
                }
                if !taken {
                    render_nodes(otherwise, root, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Evaluate one expression.
pub fn eval(expr: &Expr, root: &Document) -> Result<TemplateValue> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Field(path) => Ok(resolve_field(root, path)),
        Expr::Call { function, args } if function.short_circuits() => {
            // and/or stop at the first operand that decides the result
            let want_truthy = matches!(function, super::functions::Function::Or);
            let mut last = TemplateValue::Nil;
            for arg in args {
                last = eval(arg, root)?;
                if last.is_truthy() == want_truthy {
                    return Ok(last);
                }
            }
            Ok(last)
        }
        Expr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| eval(arg, root))
                .collect::<Result<Vec<_>>>()?;
            function.apply(values)
        }
    }
}

/// Missing fields, and fields reached through non-objects, read as nil.
fn resolve_field(root: &Document, path: &[String]) -> TemplateValue {
    let Some((first, rest)) = path.split_first() else {
        return TemplateValue::Json(Value::Object(root.clone()));
    };
    let mut current = match root.get(first) {
        Some(value) => value,
        None => return TemplateValue::Nil,
    };
    for part in rest {
        match current.as_object().and_then(|map| map.get(part)) {
            Some(value) => current = value,
            None => return TemplateValue::Nil,
        }
    }
    TemplateValue::from_json(current)
}

#[cfg(test)]
mod tests {
    use super::super::lexer::lex;
    use super::super::parser::parse;
    use super::*;
    use serde_json::json;

    fn run(source: &str, data: Value) -> String {
        let nodes = parse(lex(source).unwrap()).unwrap();
        let root = data.as_object().cloned().unwrap();
        let mut out = String::new();
        render_nodes(&nodes, &root, &mut out).unwrap();
        out
    }

    #[test]
    fn test_fields_and_text() {
        assert_eq!(
            run("{{ .user.name }} is {{ .age }}", json!({"user": {"name": "ada"}, "age": 36})),
            "ada is 36"
        );
        assert_eq!(run("{{ .missing }}", json!({})), "<no value>");
        assert_eq!(run("{{ .a.b }}", json!({"a": "flat"})), "<no value>");
    }

    #[test]
    fn test_conditionals() {
        let source = "{{ if gt .price 100.0 }}high{{ else if gt .price 10.0 }}mid{{ else }}low{{ end }}";
        assert_eq!(run(source, json!({"price": 150})), "high");
        assert_eq!(run(source, json!({"price": 50})), "mid");
        assert_eq!(run(source, json!({"price": 5})), "low");
    }

    #[test]
    fn test_short_circuit() {
        // the second operand would fail on a string
        assert_eq!(run(r#"{{ or true (sqrt "x") }}"#, json!({})), "true");
        assert_eq!(run(r#"{{ and false (sqrt "x") }}"#, json!({})), "false");
    }

    #[test]
    fn test_arithmetic_pipeline() {
        assert_eq!(run("{{ .rating | mul 2 | add 1 }}", json!({"rating": 4.5})), "10");
        assert_eq!(run("{{ div .a .b }}", json!({"a": 1, "b": 0})), "0");
    }

    #[test]
    fn test_runtime_error() {
        let nodes = parse(lex(r#"{{ sqrt "x" }}"#).unwrap()).unwrap();
        let mut out = String::new();
        assert!(render_nodes(&nodes, &Document::new(), &mut out).is_err());
    }
}
