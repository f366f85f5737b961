//! Event tree reconstruction
//!
//! [`TreeBuilder`] folds the block stream into an [`EventTree`]: every block
//! becomes an event with the next sequential id, is classified, gets its parent
//! resolved against everything finalized before it, and is appended to that
//! parent's children. Nothing is revisited once finalized.

use crate::classifier::{classify, Classified};
use crate::resolver::resolve_parent;
use crate::types::{Annotation, Event, EventId, EventKind, Result, ROOT_ID};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Counters collected while building a tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub level_enters: usize,
    pub pob_expansions: usize,
    pub lemmas_added: usize,
    pub propagations: usize,
    pub unknown: usize,
    /// Structured events whose parent search failed and fell back to the root
    pub root_fallbacks: usize,
    /// Headers that matched a prefix but not its label grammar
    pub malformed_headers: usize,
}

impl TreeStats {
    fn record(&mut self, kind: EventKind) {
        match kind {
            EventKind::LevelEnter => self.level_enters += 1,
            EventKind::PobExpand => self.pob_expansions += 1,
            EventKind::LemmaAdd => self.lemmas_added += 1,
            EventKind::LemmaPropagate => self.propagations += 1,
            EventKind::Unknown => self.unknown += 1,
        }
    }

    /// Number of events produced (root excluded)
    pub fn total_events(&self) -> usize {
        self.level_enters + self.pob_expansions + self.lemmas_added + self.propagations + self.unknown
    }

    /// Count for one kind
    pub fn count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::LevelEnter => self.level_enters,
            EventKind::PobExpand => self.pob_expansions,
            EventKind::LemmaAdd => self.lemmas_added,
            EventKind::LemmaPropagate => self.propagations,
            EventKind::Unknown => self.unknown,
        }
    }
}

/// A reconstructed proof-search tree
///
/// Events are stored in an arena indexed by id; index 0 is the root sentinel.
/// Every non-root event's parent has a smaller id than the event itself.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTree {
    events: Vec<Event>,
    stats: TreeStats,
}

impl EventTree {
    /// A tree holding only the root sentinel
    pub fn new() -> Self {
        Self {
            events: vec![Event::root()],
            stats: TreeStats::default(),
        }
    }

    pub fn root(&self) -> &Event {
        &self.events[ROOT_ID]
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(id)
    }

    /// All events in id order, root first
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Number of events including the root
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when the tree holds nothing but the root
    pub fn is_empty(&self) -> bool {
        self.events.len() <= 1
    }

    pub fn stats(&self) -> &TreeStats {
        &self.stats
    }

    /// Children of `id`, in discovery order
    pub fn children_of(&self, id: EventId) -> impl Iterator<Item = &Event> + '_ {
        self.events
            .get(id)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |child| self.events.get(*child))
    }

    /// Attach (or replace) the annotation of one event
    ///
    /// Returns false if no event has that id.
    pub fn set_annotation(&mut self, id: EventId, annotation: Annotation) -> bool {
        match self.events.get_mut(id) {
            Some(event) => {
                event.annotation = Some(annotation);
                true
            }
            None => false,
        }
    }

    /// JSON mapping from event id to event record
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Serialized JSON mapping, optionally pretty-printed
    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

impl Default for EventTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for EventTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.events.len()))?;
        for event in &self.events {
            map.serialize_entry(&event.id.to_string(), event)?;
        }
        map.end()
    }
}

/// Single-pass tree builder
pub struct TreeBuilder {
    tree: EventTree,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            tree: EventTree::new(),
        }
    }

    /// Id the next finalized block will receive
    pub fn next_id(&self) -> EventId {
        self.tree.events.len()
    }

    /// Finalize one block as an event and attach it to its parent
    ///
    /// # Returns
    /// * The id assigned to the new event
    pub fn push_block(&mut self, lines: Vec<String>) -> EventId {
        let id = self.next_id();
        let Classified {
            kind,
            fields,
            malformed,
        } = classify(&lines);

        let resolution = resolve_parent(kind, fields.level, &self.tree.events);
        if resolution.fallback {
            log::warn!(
                "No structural parent for {} event {} ({:?}), attaching to root",
                kind,
                id,
                lines.first().map(String::as_str).unwrap_or("")
            );
            self.tree.stats.root_fallbacks += 1;
        }
        if malformed {
            self.tree.stats.malformed_headers += 1;
        }
        self.tree.stats.record(kind);

        log::trace!("Event {}: {} -> parent {}", id, kind, resolution.parent);

        self.tree.events[resolution.parent].children.push(id);
        self.tree.events.push(Event {
            id,
            kind,
            parent: Some(resolution.parent),
            children: Vec::new(),
            lines,
            level: fields.level,
            depth: fields.depth,
            expr_id: fields.expr_id,
            pob_id: fields.pob_id,
            predicate: fields.predicate,
            annotation: None,
        });
        id
    }

    /// Finalize every block of a stream, in order
    pub fn extend_blocks<I>(&mut self, blocks: I)
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        for block in blocks {
            self.push_block(block);
        }
    }

    pub fn finish(self) -> EventTree {
        self.tree
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Level;

    fn block(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_empty_builder_has_only_root() {
        let tree = TreeBuilder::new().finish();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_empty());
        assert!(tree.root().is_root());
        assert_eq!(tree.stats().total_events(), 0);
    }

    #[test]
    fn test_ids_are_sequential_and_children_appended() {
        let mut builder = TreeBuilder::new();
        assert_eq!(builder.push_block(block(&["* LEVEL 0"])), 1);
        assert_eq!(builder.push_block(block(&["Propagating"])), 2);
        assert_eq!(builder.push_block(block(&["noise"])), 3);
        assert_eq!(builder.push_block(block(&["Propagating"])), 4);
        let tree = builder.finish();

        assert_eq!(tree.root().children, vec![1, 3]);
        assert_eq!(tree.get(1).unwrap().children, vec![2, 4]);
        let kinds: Vec<_> = tree.children_of(1).map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::LemmaPropagate, EventKind::LemmaPropagate]);
    }

    #[test]
    fn test_stats_count_fallbacks_and_malformed_headers() {
        let mut builder = TreeBuilder::new();
        builder.extend_blocks(vec![
            block(&["** expand-pob level: 0 depth: 0 exprID: 5 pobID: none"]),
            block(&["* LEVEL x"]),
            block(&["unrelated"]),
        ]);
        let tree = builder.finish();
        let stats = tree.stats();

        assert_eq!(stats.pob_expansions, 1);
        assert_eq!(stats.level_enters, 1);
        assert_eq!(stats.unknown, 1);
        assert_eq!(stats.root_fallbacks, 1);
        assert_eq!(stats.malformed_headers, 1);
        assert_eq!(tree.get(2).unwrap().level, None);
        assert_eq!(tree.get(1).unwrap().level, Some(Level::Bounded(0)));
    }

    #[test]
    fn test_json_mapping_uses_string_keys() {
        let mut builder = TreeBuilder::new();
        builder.push_block(block(&["* LEVEL 0"]));
        let json = builder.finish().to_json_value().unwrap();

        let map = json.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["1"]["event_type"], "EType.EXP_LVL");
        assert_eq!(map["1"]["parent"], 0);
        assert_eq!(map["0"]["children"], serde_json::json!([1]));
    }

    #[test]
    fn test_set_annotation() {
        let mut tree = TreeBuilder::new().finish();
        assert!(tree.set_annotation(0, Annotation::Incomplete));
        assert!(!tree.set_annotation(7, Annotation::Incomplete));
        assert_eq!(tree.root().annotation, Some(Annotation::Incomplete));
    }
}
