//! Parent resolution
//!
//! The trace carries no parent pointers: nesting is implied by event order and
//! levels. Each kind has its own backward-search rule over the events finalized
//! so far (most recent last, root sentinel first):
//!
//! - `LemmaAdd`: the immediately preceding event if it is a `PobExpand`,
//!   otherwise the nearest `LemmaPropagate`.
//! - `PobExpand`: the immediately preceding event if it is a `PobExpand` exactly
//!   one level up, otherwise the nearest event that is either a `LevelEnter` or a
//!   `PobExpand` at a strictly greater level. Whichever is met first wins.
//! - `LemmaPropagate`: the nearest `LevelEnter`.
//! - `LevelEnter` and `Unknown`: always the root.
//!
//! When a search finds nothing the root is used and the resolution is flagged
//! as a fallback so the caller can report it.

use crate::types::{Event, EventId, EventKind, Level, ROOT_ID};

/// The parent chosen for a new event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub parent: EventId,
    /// True if the structural search failed and the root was used instead
    pub fallback: bool,
}

impl Resolution {
    fn found(parent: EventId) -> Self {
        Self {
            parent,
            fallback: false,
        }
    }

    fn root_fallback() -> Self {
        Self {
            parent: ROOT_ID,
            fallback: true,
        }
    }
}

/// Select the parent of a new event of `kind` at `level`
///
/// # Arguments
/// * `kind` - Kind of the event being finalized
/// * `level` - Its decoded level, if any
/// * `finalized` - Every event finalized so far, root first, most recent last
pub fn resolve_parent(kind: EventKind, level: Option<Level>, finalized: &[Event]) -> Resolution {
    match kind {
        EventKind::LemmaAdd => resolve_lemma_add(finalized),
        EventKind::PobExpand => resolve_pob_expand(level, finalized),
        EventKind::LemmaPropagate => nearest(finalized, |e| e.kind == EventKind::LevelEnter),
        EventKind::LevelEnter | EventKind::Unknown => Resolution::found(ROOT_ID),
    }
}

fn resolve_lemma_add(finalized: &[Event]) -> Resolution {
    match finalized.last() {
        Some(prev) if prev.kind == EventKind::PobExpand => Resolution::found(prev.id),
        _ => nearest(finalized, |e| e.kind == EventKind::LemmaPropagate),
    }
}

fn resolve_pob_expand(level: Option<Level>, finalized: &[Event]) -> Resolution {
    if let Some(prev) = finalized.last() {
        if prev.kind == EventKind::PobExpand && levels_match(prev.level, level, Level::is_one_above) {
            return Resolution::found(prev.id);
        }
    }

    // The order of these two checks decides ties and must not change
    nearest(finalized, |e| match e.kind {
        EventKind::LevelEnter => true,
        EventKind::PobExpand => levels_match(e.level, level, Level::is_above),
        _ => false,
    })
}

/// Compare two optional levels; undecoded levels never match
fn levels_match(
    candidate: Option<Level>,
    level: Option<Level>,
    relation: fn(&Level, &Level) -> bool,
) -> bool {
    match (candidate, level) {
        (Some(candidate), Some(level)) => relation(&candidate, &level),
        _ => false,
    }
}

/// Scan backward for the nearest event matching `predicate`
fn nearest<F>(finalized: &[Event], predicate: F) -> Resolution
where
    F: Fn(&Event) -> bool,
{
    finalized
        .iter()
        .rev()
        .find(|e| predicate(e))
        .map(|e| Resolution::found(e.id))
        .unwrap_or_else(Resolution::root_fallback)
}
