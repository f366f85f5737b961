//! Expression parsing collaborators
//!
//! The annotation pass only orchestrates when an expression is parsed; the
//! parsing itself sits behind [`ExpressionParser`]. [`SmtExpressionParser`] is
//! the built-in implementation for SMT-LIB expression text.

pub mod ast;
pub mod declarations;
pub mod sexp;

pub use ast::ExprAst;
pub use declarations::{Declaration, DeclarationContext};
pub use sexp::{ParseError, SExpr};

use crate::types::Result;

/// Parse, canonicalize and render solver expressions
///
/// Any step may fail; the annotation pass turns a failure into the
/// "trace is incomplete" marker for that event only.
pub trait ExpressionParser: Send + Sync {
    type Ast: Send;

    /// Parse expression text against a declaration context
    fn parse_expression(&self, text: &str, context: &DeclarationContext) -> Result<Self::Ast>;

    /// Put an AST into its canonical, order-independent form
    fn order_ast(&self, ast: Self::Ast) -> Self::Ast;

    /// Render an AST as JSON
    fn ast_to_json(&self, ast: &Self::Ast) -> Result<serde_json::Value>;
}

/// SMT-LIB expression parser
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtExpressionParser;

impl ExpressionParser for SmtExpressionParser {
    type Ast = ExprAst;

    fn parse_expression(&self, text: &str, context: &DeclarationContext) -> Result<ExprAst> {
        let sexp = sexp::parse_single(text)?;
        Ok(ExprAst::from_sexp(&sexp, context))
    }

    fn order_ast(&self, ast: ExprAst) -> ExprAst {
        ast.canonical()
    }

    fn ast_to_json(&self, ast: &ExprAst) -> Result<serde_json::Value> {
        Ok(ast.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smt_parser_chain() {
        let parser = SmtExpressionParser;
        let context = DeclarationContext::from_chc_str("(declare-rel inv (Int))").unwrap();

        let ast = parser
            .parse_expression("(and (>= inv_0_n 0)\n(<= inv_0_n 3))\n", &context)
            .unwrap();
        let json = parser.ast_to_json(&parser.order_ast(ast)).unwrap();

        assert_eq!(json["content"], "and");
        assert_eq!(json["children"][0]["content"], "<=");
        assert_eq!(json["children"][0]["children"][0]["sort"], "Int");
    }

    #[test]
    fn test_incomplete_text_fails() {
        let parser = SmtExpressionParser;
        let result = parser.parse_expression("(and (>= x 0)\n", &DeclarationContext::new());
        assert!(matches!(
            result,
            Err(crate::types::DecoderError::ExpressionParseError(_))
        ));
    }
}
