//! Expression AST, canonical ordering and JSON conversion

use super::declarations::DeclarationContext;
use super::sexp::SExpr;
use serde_json::{json, Value};
use std::fmt;

/// Operators whose operands can be reordered without changing meaning
pub const COMMUTATIVE_OPS: &[&str] = &["and", "or", "+", "*", "=", "distinct", "xor"];

/// Operators whose nested applications are merged into one
const ASSOCIATIVE_OPS: &[&str] = &["and", "or"];

/// A parsed solver expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprAst {
    /// Literal: numeral, decimal, bitvector, string, keyword, `true`/`false`
    Const(String),
    /// A variable, with its sort when it is declared in the context
    Var { name: String, sort: Option<String> },
    /// Operator application, e.g. `(<= x 3)`
    App { op: String, args: Vec<ExprAst> },
    /// Any other list (binding lists, indexed identifiers, ...)
    List(Vec<ExprAst>),
}

impl ExprAst {
    /// Convert an S-expression, resolving declared symbols
    pub fn from_sexp(sexp: &SExpr, context: &DeclarationContext) -> Self {
        match sexp {
            SExpr::Symbol(s) if s == "true" || s == "false" => ExprAst::Const(s.clone()),
            SExpr::Symbol(s) => ExprAst::Var {
                name: s.clone(),
                sort: context.sort_of(s).map(|sort| sort.to_string()),
            },
            SExpr::List(items) => match items.split_first() {
                Some((SExpr::Symbol(op), rest)) => ExprAst::App {
                    op: op.clone(),
                    args: rest.iter().map(|a| Self::from_sexp(a, context)).collect(),
                },
                _ => ExprAst::List(items.iter().map(|a| Self::from_sexp(a, context)).collect()),
            },
            atom => ExprAst::Const(atom.to_string()),
        }
    }

    /// Deterministic, operand-order-independent form
    ///
    /// Nested `and`/`or` are flattened and the operands of commutative
    /// operators are sorted by their rendered text, bottom-up.
    pub fn canonical(self) -> Self {
        match self {
            ExprAst::App { op, args } => {
                let mut args: Vec<ExprAst> = args.into_iter().map(ExprAst::canonical).collect();

                if ASSOCIATIVE_OPS.contains(&op.as_str()) {
                    args = args
                        .into_iter()
                        .flat_map(|arg| match arg {
                            ExprAst::App { op: inner, args: inner_args } if inner == op => inner_args,
                            other => vec![other],
                        })
                        .collect();
                }
                if COMMUTATIVE_OPS.contains(&op.as_str()) {
                    args.sort_by_cached_key(|arg| arg.to_string());
                }
                ExprAst::App { op, args }
            }
            ExprAst::List(items) => ExprAst::List(items.into_iter().map(ExprAst::canonical).collect()),
            leaf => leaf,
        }
    }

    /// JSON tree: `{"type": ..., "content": ..., "children"/"sort": ...}`
    pub fn to_json(&self) -> Value {
        match self {
            ExprAst::Const(value) => json!({"type": "const", "content": value}),
            ExprAst::Var { name, sort } => json!({"type": "var", "content": name, "sort": sort}),
            ExprAst::App { op, args } => json!({
                "type": "app",
                "content": op,
                "children": args.iter().map(ExprAst::to_json).collect::<Vec<_>>(),
            }),
            ExprAst::List(items) => json!({
                "type": "list",
                "content": "",
                "children": items.iter().map(ExprAst::to_json).collect::<Vec<_>>(),
            }),
        }
    }
}

impl fmt::Display for ExprAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprAst::Const(value) => write!(f, "{}", value),
            ExprAst::Var { name, .. } => write!(f, "{}", SExpr::Symbol(name.clone())),
            ExprAst::App { op, args } => {
                write!(f, "({}", SExpr::Symbol(op.clone()))?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
            ExprAst::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::sexp::parse_single;

    fn ast(text: &str) -> ExprAst {
        ExprAst::from_sexp(&parse_single(text).unwrap(), &DeclarationContext::new())
    }

    #[test]
    fn test_conversion() {
        let mut context = DeclarationContext::new();
        context.declare("x", SExpr::Symbol("Int".to_string()));
        let parsed = ExprAst::from_sexp(&parse_single("(<= x 3)").unwrap(), &context);
        assert_eq!(
            parsed,
            ExprAst::App {
                op: "<=".to_string(),
                args: vec![
                    ExprAst::Var { name: "x".to_string(), sort: Some("Int".to_string()) },
                    ExprAst::Const("3".to_string()),
                ],
            }
        );
        assert_eq!(ast("true"), ExprAst::Const("true".to_string()));
    }

    #[test]
    fn test_canonical_form_ignores_operand_order() {
        let a = ast("(and (<= x 3) (or b a) (= y x))").canonical();
        let b = ast("(and (= x y) (or a b) (<= x 3))").canonical();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "(and (<= x 3) (= x y) (or a b))");
    }

    #[test]
    fn test_canonical_form_keeps_non_commutative_order() {
        let e = ast("(<= y x)").canonical();
        assert_eq!(e.to_string(), "(<= y x)");
        let e = ast("(- b a)").canonical();
        assert_eq!(e.to_string(), "(- b a)");
    }

    #[test]
    fn test_nested_conjunctions_are_flattened() {
        let e = ast("(and c (and b (and a d)))").canonical();
        assert_eq!(e.to_string(), "(and a b c d)");
        // Different operators are not merged
        let e = ast("(and c (or b a))").canonical();
        assert_eq!(e.to_string(), "(and (or a b) c)");
    }

    #[test]
    fn test_json_shape() {
        let json = ast("(not (= x 1))").to_json();
        assert_eq!(json["type"], "app");
        assert_eq!(json["content"], "not");
        assert_eq!(json["children"][0]["content"], "=");
        assert_eq!(json["children"][0]["children"][0]["type"], "var");
        assert_eq!(json["children"][0]["children"][0]["sort"], Value::Null);
        assert_eq!(json["children"][0]["children"][1]["type"], "const");
    }

    #[test]
    fn test_binding_lists() {
        let e = ast("(let ((a 1)) (+ a x))");
        match &e {
            ExprAst::App { op, args } => {
                assert_eq!(op, "let");
                assert!(matches!(args[0], ExprAst::List(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(e.canonical().to_string(), "(let ((a 1)) (+ a x))");
    }
}
