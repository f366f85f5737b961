//! Event classification and header decoding
//!
//! The kind of an event is decided by the leading tokens of its first line.
//! Kind-specific numeric fields are decoded from that same line:
//!
//! ```text
//! * LEVEL 3
//! ** expand-pob: main@_bb level: 2 depth: 0 exprID: 17 pobID: 4
//! ** add-lemma: oo exprID: 23 pobID: 4
//! Propagating
//! ```
//!
//! A header that starts with a known prefix but does not follow its label
//! grammar keeps the matched kind with every field left absent. Decoding never
//! fails past this module.

use crate::types::{DecoderError, EventKind, Level, PobId, Result};

pub const LEVEL_ENTER_PREFIX: &str = "* LEVEL";
pub const EXPAND_POB_PREFIX: &str = "** expand-pob";
pub const ADD_LEMMA_PREFIX: &str = "** add-lemma";
pub const PROPAGATE_PREFIX: &str = "Propagating";

/// Fields decoded from a header line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderFields {
    pub level: Option<Level>,
    pub depth: Option<i64>,
    pub expr_id: Option<i64>,
    pub pob_id: PobId,
    pub predicate: Option<String>,
}

/// Outcome of classifying one block
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub kind: EventKind,
    pub fields: HeaderFields,
    /// True if the header matched a prefix but not its label grammar
    pub malformed: bool,
}

/// Classify a block and decode its header fields
pub fn classify(block: &[String]) -> Classified {
    let header = match block.first() {
        Some(header) => header.as_str(),
        None => {
            return Classified {
                kind: EventKind::Unknown,
                fields: HeaderFields::default(),
                malformed: false,
            }
        }
    };

    let kind = kind_of(header);
    match decode_header(kind, header) {
        Ok(fields) => Classified {
            kind,
            fields,
            malformed: false,
        },
        Err(e) => {
            log::debug!("{} header left undecoded ({}): {:?}", kind, e, header);
            Classified {
                kind,
                fields: HeaderFields::default(),
                malformed: true,
            }
        }
    }
}

/// Decide the event kind from a header line (first match wins)
pub fn kind_of(header: &str) -> EventKind {
    if header.starts_with(LEVEL_ENTER_PREFIX) {
        EventKind::LevelEnter
    } else if header.starts_with(EXPAND_POB_PREFIX) {
        EventKind::PobExpand
    } else if header.starts_with(ADD_LEMMA_PREFIX) {
        EventKind::LemmaAdd
    } else if header.starts_with(PROPAGATE_PREFIX) {
        EventKind::LemmaPropagate
    } else {
        EventKind::Unknown
    }
}

/// Decode the kind-specific fields of a header line
pub fn decode_header(kind: EventKind, header: &str) -> Result<HeaderFields> {
    let tokens: Vec<&str> = header.split_whitespace().collect();
    match kind {
        EventKind::LevelEnter => decode_level_enter(&tokens),
        EventKind::PobExpand => decode_expand_pob(&tokens),
        EventKind::LemmaAdd => decode_add_lemma(&tokens),
        EventKind::LemmaPropagate | EventKind::Unknown => Ok(HeaderFields::default()),
    }
}

/// Expression text of a block: every line after the header, newline-terminated
pub fn expression_text(kind: EventKind, lines: &[String]) -> String {
    lines
        .iter()
        .skip(kind.header_lines())
        .fold(String::new(), |mut text, line| {
            text.push_str(line);
            text.push('\n');
            text
        })
}

/// `* LEVEL <n>`
fn decode_level_enter(tokens: &[&str]) -> Result<HeaderFields> {
    let last = tokens
        .last()
        .ok_or_else(|| malformed("empty level header"))?;
    Ok(HeaderFields {
        level: Some(Level::Bounded(parse_int(last, "level")?)),
        ..HeaderFields::default()
    })
}

/// `** expand-pob[:] [<predicate>...] level: <l> depth: <d> exprID: <e> pobID: <p|none>`
fn decode_expand_pob(tokens: &[&str]) -> Result<HeaderFields> {
    let start = tokens
        .iter()
        .position(|t| *t == "level:")
        .ok_or_else(|| malformed("missing 'level:' label"))?;

    // Tokens between the prefix and the first label name the relation
    let predicate = tokens.get(2..start).filter(|names| !names.is_empty()).map(|names| names.join(" "));

    let fields = &tokens[start..];
    if fields.len() < 8 {
        return Err(malformed("truncated expand-pob header"));
    }
    expect_label(fields[2], "depth:")?;
    expect_label(fields[4], "exprID:")?;
    expect_label(fields[6], "pobID:")?;

    let pob_id = if fields[7] == PobId::NONE_MARKER {
        PobId::Absent
    } else {
        PobId::Id(parse_int(fields[7], "pobID")?)
    };

    Ok(HeaderFields {
        level: Some(parse_level(fields[1])?),
        depth: Some(parse_int(fields[3], "depth")?),
        expr_id: Some(parse_int(fields[5], "exprID")?),
        pob_id,
        predicate,
    })
}

/// `** add-lemma: <l|oo> exprID: <e> pobID: <p>`
fn decode_add_lemma(tokens: &[&str]) -> Result<HeaderFields> {
    if tokens.len() < 7 {
        return Err(malformed("truncated add-lemma header"));
    }
    expect_label(tokens[1], "add-lemma:")?;
    expect_label(tokens[3], "exprID:")?;
    expect_label(tokens[5], "pobID:")?;

    Ok(HeaderFields {
        level: Some(parse_level(tokens[2])?),
        expr_id: Some(parse_int(tokens[4], "exprID")?),
        pob_id: PobId::Id(parse_int(tokens[6], "pobID")?),
        ..HeaderFields::default()
    })
}

fn expect_label(token: &str, label: &str) -> Result<()> {
    if token == label {
        Ok(())
    } else {
        Err(malformed(&format!("expected '{}', found '{}'", label, token)))
    }
}

fn parse_int(token: &str, what: &str) -> Result<i64> {
    token
        .parse()
        .map_err(|_| malformed(&format!("{} is not an integer: '{}'", what, token)))
}

fn parse_level(token: &str) -> Result<Level> {
    Level::parse(token).ok_or_else(|| malformed(&format!("invalid level: '{}'", token)))
}

fn malformed(reason: &str) -> DecoderError {
    DecoderError::HeaderDecodeError(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_kind_of() {
        assert_eq!(kind_of("* LEVEL 0"), EventKind::LevelEnter);
        assert_eq!(kind_of("** expand-pob level: 0"), EventKind::PobExpand);
        assert_eq!(kind_of("** add-lemma: 1 exprID: 3 pobID: 1"), EventKind::LemmaAdd);
        assert_eq!(kind_of("Propagating to level 3"), EventKind::LemmaPropagate);
        assert_eq!(kind_of("(and x y)"), EventKind::Unknown);
        // Prefixes are matched at the start of the raw line
        assert_eq!(kind_of("  * LEVEL 0"), EventKind::Unknown);
    }

    #[test]
    fn test_level_enter() {
        let c = classify(&block(&["* LEVEL 4"]));
        assert_eq!(c.kind, EventKind::LevelEnter);
        assert_eq!(c.fields.level, Some(Level::Bounded(4)));
        assert!(!c.malformed);
    }

    #[test]
    fn test_expand_pob_without_predicate() {
        let c = classify(&block(&[
            "** expand-pob level: 0 depth: 0 exprID: 5 pobID: none",
            "(dummy-expr)",
        ]));
        assert_eq!(c.kind, EventKind::PobExpand);
        assert_eq!(c.fields.level, Some(Level::Bounded(0)));
        assert_eq!(c.fields.depth, Some(0));
        assert_eq!(c.fields.expr_id, Some(5));
        assert_eq!(c.fields.pob_id, PobId::Absent);
        assert_eq!(c.fields.predicate, None);
    }

    #[test]
    fn test_expand_pob_with_predicate() {
        let c = classify(&block(&["** expand-pob: main@_bb level: 2 depth: 1 exprID: 17 pobID: 4"]));
        assert_eq!(c.fields.level, Some(Level::Bounded(2)));
        assert_eq!(c.fields.depth, Some(1));
        assert_eq!(c.fields.expr_id, Some(17));
        assert_eq!(c.fields.pob_id, PobId::Id(4));
        assert_eq!(c.fields.predicate.as_deref(), Some("main@_bb"));
    }

    #[test]
    fn test_add_lemma_unbounded_level() {
        let c = classify(&block(&["** add-lemma: oo exprID: 7 pobID: 3"]));
        assert_eq!(c.kind, EventKind::LemmaAdd);
        assert_eq!(c.fields.level, Some(Level::Unbounded));
        assert_eq!(c.fields.expr_id, Some(7));
        assert_eq!(c.fields.pob_id, PobId::Id(3));
    }

    #[test]
    fn test_malformed_header_keeps_kind() {
        let c = classify(&block(&["** add-lemma: 1 exprId: 7 pobID: 3"]));
        assert_eq!(c.kind, EventKind::LemmaAdd);
        assert!(c.malformed);
        assert_eq!(c.fields, HeaderFields::default());

        // Lemmas always name the obligation they block
        let c = classify(&block(&["** add-lemma: 1 exprID: 7 pobID: none"]));
        assert_eq!(c.kind, EventKind::LemmaAdd);
        assert!(c.malformed);
        assert_eq!(c.fields.level, None);
        assert_eq!(c.fields.pob_id, PobId::Absent);

        let c = classify(&block(&["** expand-pob level: x depth: 0 exprID: 5 pobID: none"]));
        assert_eq!(c.kind, EventKind::PobExpand);
        assert!(c.malformed);
        assert_eq!(c.fields.expr_id, None);

        let c = classify(&block(&["* LEVEL"]));
        assert_eq!(c.kind, EventKind::LevelEnter);
        assert!(c.malformed);
        assert_eq!(c.fields.level, None);
    }

    #[test]
    fn test_expression_text_skips_header_lines() {
        let lines = block(&["** add-lemma: 1 exprID: 7 pobID: 3", "(rel x)", "(<= x 3)", "(>= x 0)"]);
        assert_eq!(expression_text(EventKind::LemmaAdd, &lines), "(<= x 3)\n(>= x 0)\n");

        let lines = block(&["** expand-pob level: 0 depth: 0 exprID: 5 pobID: none", "(dummy-expr)"]);
        assert_eq!(expression_text(EventKind::PobExpand, &lines), "(dummy-expr)\n");

        assert_eq!(expression_text(EventKind::Unknown, &[]), "");
    }
}
