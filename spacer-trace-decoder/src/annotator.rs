//! Expression annotation pass
//!
//! Runs over a finished tree and attaches a parsed, canonical AST to every event
//! that carries a real expression. A failure on one event attaches the
//! "trace is incomplete" marker to that event and the pass continues. Parent
//! and child links are never touched.

use crate::expr::{DeclarationContext, ExpressionParser};
use crate::tree::EventTree;
use crate::types::{Annotation, EventId, Result};
use rayon::prelude::*;

/// Outcome counters of one annotation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationStats {
    /// Events that received an AST
    pub annotated: usize,
    /// Events that received the error marker
    pub failed: usize,
    /// Events without a real expression (root excluded)
    pub skipped: usize,
}

/// Attaches expression annotations to the events of a tree
pub struct ExpressionAnnotator<'a, P> {
    parser: &'a P,
    context: &'a DeclarationContext,
    min_expr_id: i64,
    parallel: bool,
}

impl<'a, P: ExpressionParser> ExpressionAnnotator<'a, P> {
    /// Create an annotator with the default expression id threshold (2)
    pub fn new(parser: &'a P, context: &'a DeclarationContext) -> Self {
        Self {
            parser,
            context,
            min_expr_id: 2,
            parallel: false,
        }
    }

    /// Only annotate events whose expression id is strictly above `threshold`
    pub fn with_min_expr_id(mut self, threshold: i64) -> Self {
        self.min_expr_id = threshold;
        self
    }

    /// Spread parsing over the rayon thread pool
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Parse, canonicalize and render one expression
    fn try_annotate(&self, text: &str) -> Result<serde_json::Value> {
        let ast = self.parser.parse_expression(text, self.context)?;
        let ordered = self.parser.order_ast(ast);
        self.parser.ast_to_json(&ordered)
    }

    /// Annotation for one expression text, never failing
    pub fn annotate_text(&self, text: &str) -> Annotation {
        match self.try_annotate(text) {
            Ok(json) => Annotation::Ast(json),
            Err(e) => {
                log::debug!("Expression left unparsed: {}", e);
                Annotation::Incomplete
            }
        }
    }

    /// Annotate every eligible event of `tree`
    pub fn annotate(&self, tree: &mut EventTree) -> AnnotationStats {
        let mut stats = AnnotationStats::default();

        let targets: Vec<(EventId, String)> = tree
            .iter()
            .filter(|event| !event.is_root() && event.has_expression(self.min_expr_id))
            .map(|event| (event.id, event.expression_text()))
            .collect();
        stats.skipped = tree.len() - 1 - targets.len();

        let annotations: Vec<(EventId, Annotation)> = if self.parallel {
            targets
                .into_par_iter()
                .map(|(id, text)| (id, self.annotate_text(&text)))
                .collect()
        } else {
            targets
                .into_iter()
                .map(|(id, text)| (id, self.annotate_text(&text)))
                .collect()
        };

        for (id, annotation) in annotations {
            log::trace!("Event {} annotated (error: {})", id, annotation.is_error());
            if annotation.is_error() {
                stats.failed += 1;
            } else {
                stats.annotated += 1;
            }
            tree.set_annotation(id, annotation);
        }

        if stats.failed > 0 {
            log::warn!(
                "{} of {} expressions could not be parsed (trace is incomplete)",
                stats.failed,
                stats.failed + stats.annotated
            );
        }
        stats
    }
}
