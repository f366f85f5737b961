//! Declaration context for expression parsing
//!
//! Lemmas in a Spacer trace are stated over the arguments of the relations
//! declared in the CHC input file. Argument `i` of relation `R` is named
//! `R_i_n`. The context maps those names to their sorts so parsed expressions
//! can carry typed variables.
//!
//! A context can be built from the CHC input itself:
//!
//! ```text
//! (declare-rel inv (Int Bool))
//! (declare-fun step (Int Int) Bool)
//! ```
//!
//! or from the `declare-const` statements a previous run wrote out:
//!
//! ```text
//! (declare-const inv_0_n (Int))
//! (declare-const inv_1_n (Bool))
//! ```

use super::sexp::{self, SExpr};
use crate::types::{DecoderError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Relation the solver adds for the query itself; never part of the context
pub const QUERY_RELATION: &str = "simple!!query";

/// Name given to argument `index` of `relation`
pub fn arg_name(relation: &str, index: usize) -> String {
    format!("{}_{}_n", relation, index)
}

/// A single declared constant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub sort: SExpr,
}

impl Declaration {
    /// `(declare-const NAME (SORT))`
    pub fn to_statement(&self) -> String {
        let name = SExpr::Symbol(self.name.clone());
        match &self.sort {
            SExpr::List(_) => format!("(declare-const {} {})", name, self.sort),
            atom => format!("(declare-const {} ({}))", name, atom),
        }
    }
}

/// Ordered set of declarations, looked up by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclarationContext {
    declarations: Vec<Declaration>,
    index: HashMap<String, usize>,
}

impl DeclarationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from CHC input text (`declare-rel` / `declare-fun`)
    pub fn from_chc_str(input: &str) -> Result<Self> {
        let commands = sexp::parse_all(input).map_err(|e| {
            DecoderError::DeclarationError(format!("Failed to read CHC input: {}", e))
        })?;

        let mut context = Self::new();
        for command in &commands {
            let items = match command.as_list() {
                Some(items) => items,
                None => continue,
            };
            match command.head_symbol() {
                Some("declare-rel") => {
                    let (name, sorts) = relation_signature(items)?;
                    context.declare_relation(name, sorts);
                }
                Some("declare-fun") => {
                    let (name, sorts) = relation_signature(items)?;
                    match items.get(3) {
                        Some(ret) if ret.is_symbol("Bool") => context.declare_relation(name, sorts),
                        _ => log::debug!("Skipping non-predicate function declaration: {}", name),
                    }
                }
                _ => {}
            }
        }

        log::debug!("Loaded {} declarations from CHC input", context.len());
        Ok(context)
    }

    /// Build a context from a CHC input file
    pub fn from_chc_file(path: &Path) -> Result<Self> {
        log::info!("Loading relation declarations from: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_chc_str(&content)
    }

    /// Build a context from `declare-const` statements
    pub fn from_declare_statements(input: &str) -> Result<Self> {
        let commands = sexp::parse_all(input).map_err(|e| {
            DecoderError::DeclarationError(format!("Failed to read declarations: {}", e))
        })?;

        let mut context = Self::new();
        for command in &commands {
            if command.head_symbol() != Some("declare-const") {
                continue;
            }
            match command.as_list() {
                Some([_, SExpr::Symbol(name), sort]) => {
                    context.declare(name.clone(), unwrap_sort(sort));
                }
                _ => {
                    return Err(DecoderError::DeclarationError(format!(
                        "Malformed declaration: {}",
                        command
                    )))
                }
            }
        }
        Ok(context)
    }

    /// Build a context from a file of `declare-const` statements
    pub fn from_declarations_file(path: &Path) -> Result<Self> {
        log::info!("Loading declarations from: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_declare_statements(&content)
    }

    /// Declare one constant; the first declaration of a name wins
    pub fn declare(&mut self, name: impl Into<String>, sort: SExpr) {
        let name = name.into();
        if self.index.contains_key(&name) {
            log::debug!("Ignoring duplicate declaration of {}", name);
            return;
        }
        self.index.insert(name.clone(), self.declarations.len());
        self.declarations.push(Declaration { name, sort });
    }

    /// Declare one constant per argument of a relation
    pub fn declare_relation(&mut self, relation: &str, arg_sorts: &[SExpr]) {
        if relation == QUERY_RELATION {
            return;
        }
        for (i, sort) in arg_sorts.iter().enumerate() {
            self.declare(arg_name(relation, i), sort.clone());
        }
    }

    pub fn sort_of(&self, name: &str) -> Option<&SExpr> {
        self.index.get(name).map(|&i| &self.declarations[i].sort)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Declaration> {
        self.declarations.iter()
    }

    /// One `declare-const` statement per line, in declaration order
    pub fn to_declare_statements(&self) -> String {
        self.declarations
            .iter()
            .map(|d| d.to_statement() + "\n")
            .collect()
    }
}

/// Name and argument sorts of `(declare-rel NAME (SORTS))` / `(declare-fun NAME (SORTS) RET)`
fn relation_signature(items: &[SExpr]) -> Result<(&str, &[SExpr])> {
    match items {
        [_, name, SExpr::List(sorts), ..] => {
            let name = name.as_symbol().ok_or_else(|| {
                DecoderError::DeclarationError(format!("Invalid relation name: {}", name))
            })?;
            Ok((name, sorts.as_slice()))
        }
        _ => Err(DecoderError::DeclarationError(format!(
            "Malformed relation declaration: {}",
            SExpr::List(items.to_vec())
        ))),
    }
}

/// `(Int)` as written in declaration files is the sort `Int`
fn unwrap_sort(sort: &SExpr) -> SExpr {
    match sort.as_list() {
        Some([single]) if single.as_list().is_none() => single.clone(),
        _ => sort.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CHC_INPUT: &str = r#"
(set-logic HORN)
(declare-rel inv (Int Bool))
(declare-fun step (Int (Array Int Int)) Bool)
(declare-fun f (Int) Int)
(declare-rel simple!!query ())
(declare-var x Int)
(rule (=> (= x 0) (inv x true)))
(query simple!!query)
"#;

    #[test]
    fn test_relation_arguments_become_constants() {
        let context = DeclarationContext::from_chc_str(CHC_INPUT).unwrap();
        let names: Vec<_> = context.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["inv_0_n", "inv_1_n", "step_0_n", "step_1_n"]);
        assert_eq!(context.sort_of("inv_1_n"), Some(&SExpr::Symbol("Bool".to_string())));
        assert!(!context.is_declared("f_0_n"));
    }

    #[test]
    fn test_declare_statements_format() {
        let context = DeclarationContext::from_chc_str(CHC_INPUT).unwrap();
        let statements = context.to_declare_statements();
        assert_eq!(
            statements,
            "(declare-const inv_0_n (Int))\n\
             (declare-const inv_1_n (Bool))\n\
             (declare-const step_0_n (Int))\n\
             (declare-const step_1_n (Array Int Int))\n"
        );
    }

    #[test]
    fn test_statements_read_back() {
        let context = DeclarationContext::from_chc_str(CHC_INPUT).unwrap();
        let reread = DeclarationContext::from_declare_statements(&context.to_declare_statements()).unwrap();
        assert_eq!(reread, context);
    }

    #[test]
    fn test_declarations_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"(declare-const |main@%x_0_n| (Int))\n")
            .unwrap();
        temp_file.flush().unwrap();

        let context = DeclarationContext::from_declarations_file(temp_file.path()).unwrap();
        assert_eq!(context.len(), 1);
        assert!(context.is_declared("main@%x_0_n"));
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(DeclarationContext::from_chc_str("(declare-rel inv").is_err());
        assert!(DeclarationContext::from_chc_str("(declare-rel (inv) (Int))").is_err());
        assert!(DeclarationContext::from_declare_statements("(declare-const x)").is_err());
    }
}
