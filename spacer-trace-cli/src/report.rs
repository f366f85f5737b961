//! Per-trace summary
//!
//! Condenses the counters of one decode (and its annotation pass) into a
//! short report that the CLI logs once per trace.

use spacer_trace_decoder::{AnnotationStats, EventKind, EventTree, TreeStats};
use std::fmt;
use std::path::PathBuf;

/// Summary of one decoded trace
#[derive(Debug, Clone)]
pub struct TraceReport {
    pub trace: PathBuf,
    pub output: Option<PathBuf>,
    pub tree: TreeStats,
    pub annotation: Option<AnnotationStats>,
}

impl TraceReport {
    pub fn new(trace: PathBuf, tree: &EventTree, annotation: Option<AnnotationStats>) -> Self {
        Self {
            trace,
            output: None,
            tree: tree.stats().clone(),
            annotation,
        }
    }

    pub fn with_output(mut self, output: PathBuf) -> Self {
        self.output = Some(output);
        self
    }

    /// True if the trace showed any sign of truncation or corruption
    pub fn has_defects(&self) -> bool {
        self.tree.malformed_headers > 0 || self.annotation.map_or(false, |a| a.failed > 0)
    }

    /// Log the summary at info level, or warn if the trace had defects
    pub fn log(&self) {
        if self.has_defects() {
            log::warn!("{}", self);
        } else {
            log::info!("{}", self);
        }
    }
}

impl fmt::Display for TraceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {} events (", self.trace, self.tree.total_events())?;
        for (i, kind) in EventKind::ALL.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", self.tree.count(*kind), kind)?;
        }
        write!(f, ")")?;

        if self.tree.root_fallbacks > 0 {
            write!(f, ", {} attached to root", self.tree.root_fallbacks)?;
        }
        if self.tree.malformed_headers > 0 {
            write!(f, ", {} malformed headers", self.tree.malformed_headers)?;
        }
        if let Some(a) = &self.annotation {
            write!(f, "; {} expressions parsed, {} incomplete", a.annotated, a.failed)?;
        }
        if let Some(output) = &self.output {
            write!(f, " -> {:?}", output)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacer_trace_decoder::Decoder;

    #[test]
    fn test_report_summary() {
        let decoder = Decoder::new();
        let mut tree = decoder.decode_str("* LEVEL 0\n\nPropagating\n\n** add-lemma: 0 exprID: 4 pobID: 1\n(r x)\n(and x\n");
        let stats = decoder.annotate(&mut tree);

        let report = TraceReport::new(PathBuf::from("spacer.log"), &tree, Some(stats))
            .with_output(PathBuf::from("spacer.json"));
        let text = report.to_string();

        assert!(text.starts_with("\"spacer.log\": 3 events (1 LevelEnter, 0 PobExpand, 1 LemmaAdd, 1 LemmaPropagate, 0 Unknown)"));
        assert!(text.contains("0 expressions parsed, 1 incomplete"));
        assert!(text.ends_with("-> \"spacer.json\""));
        assert!(report.has_defects());
    }

    #[test]
    fn test_clean_report() {
        let tree = Decoder::new().decode_str("* LEVEL 0\n");
        let report = TraceReport::new(PathBuf::from("t.log"), &tree, None);
        assert!(!report.has_defects());
        assert!(!report.to_string().contains("attached to root"));
    }
}
