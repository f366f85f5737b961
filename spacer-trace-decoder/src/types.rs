//! Core types for the Spacer trace decoder
//!
//! This module defines the event records the decoder reconstructs from a solver
//! trace, the field types decoded from event headers, and the error type shared
//! by the whole library. The decoder is a pure function from lines to a tree:
//! nothing here owns files or shared state.

use crate::classifier;
use serde::ser::{Serialize, Serializer};
use std::fmt;

/// Sequential event identifier (0 is the root sentinel)
pub type EventId = usize;

/// Identifier of the root sentinel every tree starts with
pub const ROOT_ID: EventId = 0;

/// Wire value used for numeric fields that were absent or failed to decode
pub const UNSET: i64 = -1;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors that can occur while decoding traces or their expressions
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Failed to decode event header: {0}")]
    HeaderDecodeError(String),

    #[error("Failed to parse expression: {0}")]
    ExpressionParseError(String),

    #[error("Failed to load declarations: {0}")]
    DeclarationError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The kind of a proof-search event, decided by its header line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum EventKind {
    /// `* LEVEL n` - the solver enters a new level
    #[serde(rename = "EType.EXP_LVL")]
    LevelEnter,
    /// `** expand-pob ...` - a proof obligation is expanded
    #[serde(rename = "EType.EXP_POB")]
    PobExpand,
    /// `** add-lemma ...` - a lemma is learned
    #[serde(rename = "EType.ADD_LEM")]
    LemmaAdd,
    /// `Propagating ...` - lemmas are pushed to higher levels
    #[serde(rename = "EType.PRO_LEM")]
    LemmaPropagate,
    /// Anything else (also the kind of the root sentinel)
    #[serde(rename = "EType.NA")]
    Unknown,
}

impl EventKind {
    /// All kinds, in classification order
    pub const ALL: [EventKind; 5] = [
        EventKind::LevelEnter,
        EventKind::PobExpand,
        EventKind::LemmaAdd,
        EventKind::LemmaPropagate,
        EventKind::Unknown,
    ];

    /// Tag used for this kind in the JSON output
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::LevelEnter => "EType.EXP_LVL",
            EventKind::PobExpand => "EType.EXP_POB",
            EventKind::LemmaAdd => "EType.ADD_LEM",
            EventKind::LemmaPropagate => "EType.PRO_LEM",
            EventKind::Unknown => "EType.NA",
        }
    }

    /// Number of leading block lines that make up the header of this kind
    pub fn header_lines(&self) -> usize {
        match self {
            EventKind::LemmaAdd => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::LevelEnter => write!(f, "LevelEnter"),
            EventKind::PobExpand => write!(f, "PobExpand"),
            EventKind::LemmaAdd => write!(f, "LemmaAdd"),
            EventKind::LemmaPropagate => write!(f, "LemmaPropagate"),
            EventKind::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A proof-search level
///
/// Lemmas valid at every level carry the solver's infinity marker instead of a
/// number. `Unbounded` never compares equal to any `Bounded` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// A finite level
    Bounded(i64),
    /// The "infinite" level (`oo` in the trace)
    Unbounded,
}

impl Level {
    /// Literal the solver prints for an unbounded level
    pub const UNBOUNDED_MARKER: &'static str = "oo";

    /// Parse a level token: the unbounded marker or a decimal integer
    pub fn parse(token: &str) -> Option<Level> {
        if token == Self::UNBOUNDED_MARKER {
            Some(Level::Unbounded)
        } else {
            token.parse().ok().map(Level::Bounded)
        }
    }

    /// True if this level is strictly greater than `other`
    ///
    /// `Unbounded` is above every finite level and not above itself.
    pub fn is_above(&self, other: &Level) -> bool {
        match (self, other) {
            (Level::Bounded(a), Level::Bounded(b)) => a > b,
            (Level::Unbounded, Level::Bounded(_)) => true,
            (_, Level::Unbounded) => false,
        }
    }

    /// True if this level is exactly one above `other`
    pub fn is_one_above(&self, other: &Level) -> bool {
        match (self, other) {
            (Level::Bounded(a), Level::Bounded(b)) => b.checked_add(1) == Some(*a),
            _ => false,
        }
    }

    /// The finite value, if any
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Level::Bounded(v) => Some(*v),
            Level::Unbounded => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Bounded(v) => write!(f, "{}", v),
            Level::Unbounded => write!(f, "{}", Self::UNBOUNDED_MARKER),
        }
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Level::Bounded(v) => serializer.serialize_i64(*v),
            Level::Unbounded => serializer.serialize_str(Self::UNBOUNDED_MARKER),
        }
    }
}

/// Proof obligation reference of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PobId {
    /// A real proof obligation id
    Id(i64),
    /// No proof obligation (`none` in the trace, or not decoded)
    #[default]
    Absent,
}

impl PobId {
    /// Literal the solver prints when an expansion has no obligation id
    pub const NONE_MARKER: &'static str = "none";

    /// Value written to JSON output
    pub fn wire_value(&self) -> i64 {
        match self {
            PobId::Id(id) => *id,
            PobId::Absent => UNSET,
        }
    }
}

impl Serialize for PobId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.wire_value())
    }
}

/// Result of the expression annotation pass for one event
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// Canonical AST rendered as JSON
    Ast(serde_json::Value),
    /// The expression could not be parsed (usually a truncated trace)
    Incomplete,
}

impl Annotation {
    /// Content of the error marker attached when parsing fails
    pub const INCOMPLETE_CONTENT: &'static str = "trace is incomplete";

    /// JSON form of this annotation
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Annotation::Ast(value) => value.clone(),
            Annotation::Incomplete => serde_json::json!({
                "type": "ERROR",
                "content": Self::INCOMPLETE_CONTENT,
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Annotation::Incomplete)
    }
}

impl Serialize for Annotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Annotation::Ast(value) => value.serialize(serializer),
            Annotation::Incomplete => self.to_json().serialize(serializer),
        }
    }
}

/// One reconstructed proof-search event
///
/// Created when a block is finalized; only `children` (append-only) and
/// `annotation` change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Sequential id in discovery order
    pub id: EventId,
    /// Kind decided from the header line
    pub kind: EventKind,
    /// Resolved parent (`None` only for the root)
    pub parent: Option<EventId>,
    /// Children in discovery order
    pub children: Vec<EventId>,
    /// Raw block lines, header included
    pub lines: Vec<String>,
    /// Decoded level (`None` if absent or undecodable)
    pub level: Option<Level>,
    /// Expansion depth (`PobExpand` only)
    pub depth: Option<i64>,
    /// Expression id; values up to 2 mean "no expression"
    pub expr_id: Option<i64>,
    /// Proof obligation reference
    pub pob_id: PobId,
    /// Relation name printed in some `expand-pob` headers
    pub predicate: Option<String>,
    /// Parsed expression, attached by the annotation pass
    pub annotation: Option<Annotation>,
}

impl Event {
    /// The root sentinel every tree starts from
    pub fn root() -> Self {
        Self {
            id: ROOT_ID,
            kind: EventKind::Unknown,
            parent: None,
            children: Vec::new(),
            lines: Vec::new(),
            level: None,
            depth: None,
            expr_id: None,
            pob_id: PobId::Absent,
            predicate: None,
            annotation: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Expression text carried by this event (block lines after the header)
    pub fn expression_text(&self) -> String {
        classifier::expression_text(self.kind, &self.lines)
    }

    /// True if the expression id is strictly above `threshold`
    pub fn has_expression(&self, threshold: i64) -> bool {
        self.expr_id.map_or(false, |id| id > threshold)
    }
}

/// Borrowed wire form of an event
#[derive(serde::Serialize)]
struct WireEvent<'a> {
    #[serde(rename = "nodeID")]
    node_id: EventId,
    parent: EventId,
    children: &'a [EventId],
    event_type: EventKind,
    expr: String,
    level: Level,
    #[serde(rename = "exprID")]
    expr_id: i64,
    #[serde(rename = "pobID")]
    pob_id: PobId,
    to_be_vis: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ast_json: Option<&'a Annotation>,
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        WireEvent {
            node_id: self.id,
            // The root points at itself on the wire
            parent: self.parent.unwrap_or(ROOT_ID),
            children: &self.children,
            event_type: self.kind,
            expr: self.expression_text(),
            level: self.level.unwrap_or(Level::Bounded(UNSET)),
            expr_id: self.expr_id.unwrap_or(UNSET),
            pob_id: self.pob_id,
            to_be_vis: true,
            ast_json: self.annotation.as_ref(),
        }
        .serialize(serializer)
    }
}
