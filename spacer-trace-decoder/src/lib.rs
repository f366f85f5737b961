//! Spacer Trace Decoder Library
//!
//! A stateless, reusable library that reconstructs the proof-search tree of a
//! Spacer (CHC solver) run from its textual trace, for visualization.
//!
//! # Architecture
//!
//! Reconstruction is a single left-to-right pass:
//! - `segmenter` splits the trace into blank-line separated event blocks
//! - `classifier` decides each block's kind and decodes its header fields
//! - `resolver` picks each event's parent with kind-specific backward searches
//! - `tree` assigns sequential ids and folds everything into an [`EventTree`]
//!
//! An optional annotation pass then parses the expression carried by each
//! event into a canonical AST (see [`expr`]).
//!
//! The library does NOT:
//! - Run the solver or manage experiment files
//! - Check that the solver's answer is correct
//! - Persist anything
//!
//! # Example Usage
//!
//! ```no_run
//! use spacer_trace_decoder::{Decoder, DecoderConfig};
//! use std::path::Path;
//!
//! // Load the relation signatures the lemmas are stated over
//! let mut decoder = Decoder::with_config(DecoderConfig::new().with_parallel_annotation(true));
//! decoder.add_input_file(Path::new("input_file.smt2")).unwrap();
//!
//! // Reconstruct and annotate
//! let mut tree = decoder.decode_file(Path::new("spacer.log")).unwrap();
//! let stats = decoder.annotate(&mut tree);
//! println!("{} expressions parsed, {} incomplete", stats.annotated, stats.failed);
//!
//! println!("{}", tree.to_json_string(true).unwrap());
//! ```

// Public modules
pub mod annotator;
pub mod classifier;
pub mod config;
pub mod decoder;
pub mod expr;
pub mod resolver;
pub mod segmenter;
pub mod tree;
pub mod types;

// Re-export main types for convenience
pub use annotator::{AnnotationStats, ExpressionAnnotator};
pub use config::DecoderConfig;
pub use decoder::Decoder;
pub use expr::{DeclarationContext, ExpressionParser, SmtExpressionParser};
pub use segmenter::LogSegmenter;
pub use tree::{EventTree, TreeBuilder, TreeStats};
pub use types::{
    Annotation, DecoderError, Event, EventId, EventKind, Level, PobId, Result, ROOT_ID,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
