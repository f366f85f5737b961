//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! The Decoder struct is the entry point for loading declarations and
//! reconstructing event trees from Spacer traces.

use crate::annotator::{AnnotationStats, ExpressionAnnotator};
use crate::config::DecoderConfig;
use crate::expr::{DeclarationContext, ExpressionParser, SmtExpressionParser};
use crate::segmenter::LogSegmenter;
use crate::tree::{EventTree, TreeBuilder};
use crate::types::Result;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// The main decoder struct - entry point for all decoding operations
///
/// Decoding never shares state between calls: every call builds its own tree,
/// so one decoder can serve many traces, from many threads.
pub struct Decoder {
    config: DecoderConfig,
    /// Declarations used to type the variables of parsed expressions
    declarations: DeclarationContext,
}

impl Decoder {
    /// Create a new decoder instance with the default configuration
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            declarations: DeclarationContext::new(),
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn declarations(&self) -> &DeclarationContext {
        &self.declarations
    }

    /// Load the relation signatures of a CHC input file into the declaration context
    ///
    /// # Arguments
    /// * `path` - Path to the SMT-LIB CHC input the solver ran on
    ///
    /// # Example
    /// ```no_run
    /// use spacer_trace_decoder::Decoder;
    /// use std::path::Path;
    ///
    /// let mut decoder = Decoder::new();
    /// decoder.add_input_file(Path::new("input_file.smt2")).unwrap();
    /// ```
    pub fn add_input_file(&mut self, path: &Path) -> Result<()> {
        let context = DeclarationContext::from_chc_file(path)?;
        self.merge_declarations(context);
        log::info!("Input file loaded successfully: {:?}", path);
        Ok(())
    }

    /// Load previously written `declare-const` statements into the declaration context
    pub fn add_declarations_file(&mut self, path: &Path) -> Result<()> {
        let context = DeclarationContext::from_declarations_file(path)?;
        self.merge_declarations(context);
        log::info!("Declarations loaded successfully: {:?}", path);
        Ok(())
    }

    fn merge_declarations(&mut self, context: DeclarationContext) {
        for declaration in context.iter() {
            self.declarations
                .declare(declaration.name.clone(), declaration.sort.clone());
        }
    }

    /// Reconstruct the event tree of a sequence of trace lines
    ///
    /// Never fails: malformed headers and missing parents degrade to defaults
    /// and root attachment. Empty input yields a tree holding only the root.
    pub fn decode_lines<I, S>(&self, lines: I) -> EventTree
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = TreeBuilder::new();
        builder.extend_blocks(LogSegmenter::new(lines));
        let tree = builder.finish();

        log::debug!(
            "Reconstructed {} events ({} root fallbacks, {} malformed headers)",
            tree.stats().total_events(),
            tree.stats().root_fallbacks,
            tree.stats().malformed_headers
        );
        tree
    }

    /// Reconstruct the event tree of a trace held in memory
    pub fn decode_str(&self, trace: &str) -> EventTree {
        self.decode_lines(trace.lines())
    }

    /// Reconstruct the event tree of a trace read from any buffered reader
    ///
    /// Invalid UTF-8 (a trace cut mid-character) is replaced rather than
    /// rejected, so the damage stays confined to the affected event.
    pub fn decode_reader<R: BufRead>(&self, mut reader: R) -> Result<EventTree> {
        let mut lines = Vec::new();
        let mut buf = Vec::new();
        while reader.read_until(b'\n', &mut buf)? > 0 {
            let line = String::from_utf8_lossy(&buf);
            if matches!(line, Cow::Owned(_)) {
                log::debug!("Invalid UTF-8 replaced in trace line {}", lines.len() + 1);
            }
            lines.push(line.trim_end_matches(&['\r', '\n'][..]).to_string());
            buf.clear();
        }
        Ok(self.decode_lines(lines))
    }

    /// Reconstruct the event tree of a trace file (e.g. `spacer.log`)
    pub fn decode_file(&self, path: &Path) -> Result<EventTree> {
        log::info!("Decoding trace file: {:?}", path);
        let file = File::open(path)?;
        self.decode_reader(BufReader::new(file))
    }

    /// Run the annotation pass with the built-in SMT-LIB parser
    pub fn annotate(&self, tree: &mut EventTree) -> AnnotationStats {
        self.annotate_with(&SmtExpressionParser, tree)
    }

    /// Run the annotation pass with a caller-supplied expression parser
    pub fn annotate_with<P: ExpressionParser>(&self, parser: &P, tree: &mut EventTree) -> AnnotationStats {
        ExpressionAnnotator::new(parser, &self.declarations)
            .with_min_expr_id(self.config.min_expr_id)
            .with_parallel(self.config.parallel_annotation)
            .annotate(tree)
    }

    /// Decode a trace file and, if configured, annotate it
    pub fn process_file(&self, path: &Path) -> Result<(EventTree, Option<AnnotationStats>)> {
        let mut tree = self.decode_file(path)?;
        let stats = if self.config.annotate_expressions {
            Some(self.annotate(&mut tree))
        } else {
            None
        };
        Ok((tree, stats))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Annotation, EventKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TRACE: &str = "* LEVEL 0\n\n** expand-pob level: 0 depth: 0 exprID: 5 pobID: none\n(<= inv_0_n 3)\n\n";

    #[test]
    fn test_decoder_creation() {
        let decoder = Decoder::new();
        assert!(decoder.declarations().is_empty());
        assert!(decoder.config().annotate_expressions);
    }

    #[test]
    fn test_decode_str() {
        let tree = Decoder::new().decode_str(TRACE);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.get(2).unwrap().kind, EventKind::PobExpand);
        assert_eq!(tree.get(2).unwrap().parent, Some(1));
    }

    #[test]
    fn test_decode_file_and_annotate() {
        let mut trace = NamedTempFile::new().unwrap();
        trace.write_all(TRACE.as_bytes()).unwrap();
        trace.flush().unwrap();

        let mut input = NamedTempFile::new().unwrap();
        input.write_all(b"(declare-rel inv (Int))\n").unwrap();
        input.flush().unwrap();

        let mut decoder = Decoder::new();
        decoder.add_input_file(input.path()).unwrap();
        let (tree, stats) = decoder.process_file(trace.path()).unwrap();

        assert_eq!(tree.len(), 3);
        let ast = match &tree.get(2).unwrap().annotation {
            Some(Annotation::Ast(json)) => json.clone(),
            other => panic!("expected an AST, got {:?}", other),
        };
        assert_eq!(ast["children"][0]["sort"], "Int");
        let stats = stats.unwrap();
        assert_eq!(stats.annotated, 1);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_annotation_disabled() {
        let mut trace = NamedTempFile::new().unwrap();
        trace.write_all(TRACE.as_bytes()).unwrap();
        trace.flush().unwrap();

        let decoder = Decoder::with_config(DecoderConfig::new().with_annotation(false));
        let (tree, stats) = decoder.process_file(trace.path()).unwrap();
        assert!(stats.is_none());
        assert!(tree.iter().all(|e| e.annotation.is_none()));
    }

    #[test]
    fn test_invalid_utf8_degrades_to_incomplete_expression() {
        let bytes: &[u8] = b"* LEVEL 0\n\n** add-lemma: 0 exprID: 4 pobID: 1\n(r x)\r\n(< |x\xC3";
        let decoder = Decoder::new();
        let mut tree = decoder.decode_reader(std::io::Cursor::new(bytes)).unwrap();

        assert_eq!(tree.len(), 3);
        let lemma = tree.get(2).unwrap();
        assert_eq!(lemma.kind, EventKind::LemmaAdd);
        assert_eq!(lemma.lines[1], "(r x)");

        let stats = decoder.annotate(&mut tree);
        assert_eq!(stats.failed, 1);
        assert_eq!(tree.get(2).unwrap().annotation, Some(Annotation::Incomplete));
    }

    #[test]
    fn test_missing_file() {
        let result = Decoder::new().decode_file(Path::new("does/not/exist.log"));
        assert!(result.is_err());
    }
}
