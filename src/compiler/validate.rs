//! Structural checks run before lowering

use super::GrammarError;
use crate::grammar::{Grammar, NodeKind};
use std::collections::BTreeSet;

pub(crate) fn validate(grammar: &Grammar) -> Result<(), GrammarError> {
    if let Some(m) = grammar.misuse().first() {
        return Err(GrammarError::Misuse {
            node: m.node.clone(),
            message: m.message.clone(),
        });
    }
    if grammar.entry().index() >= grammar.nodes().len() {
        return Err(GrammarError::MissingEntry);
    }

    let reachable = grammar.reachable();
    let mut is_reachable = vec![false; grammar.nodes().len()];
    for id in &reachable {
        is_reachable[id.index()] = true;
    }
    for (index, node) in grammar.nodes().iter().enumerate() {
        // Stray error nodes are harmless; anything else is a wiring mistake.
        if !is_reachable[index] && !node.kind.is_terminal() {
            return Err(GrammarError::Unreachable(node.name.clone()));
        }
    }

    let mut started = BTreeSet::new();
    let mut ended = BTreeSet::new();

    for id in &reachable {
        let node = grammar.node(*id);
        if !node.kind.is_terminal() && node.otherwise.is_none() {
            return Err(GrammarError::MissingOtherwise(node.name.clone()));
        }

        match &node.kind {
            NodeKind::Match { edges, .. } => {
                for (i, edge) in edges.iter().enumerate() {
                    for other in &edges[i + 1..] {
                        let duplicate = edge.key == other.key;
                        let peek_conflict = (!edge.consume && other.key.first() == edge.key.first())
                            || (!other.consume && edge.key.first() == other.key.first());
                        if duplicate || peek_conflict {
                            return Err(GrammarError::AmbiguousTransition {
                                node: node.name.clone(),
                                key: String::from_utf8_lossy(&other.key).into_owned(),
                            });
                        }
                    }
                }
            }
            NodeKind::Invoke { code, .. } => {
                if let Some(field) = code.field() {
                    require_property(grammar, &node.name, field)?;
                }
            }
            NodeKind::Consume(field) => require_property(grammar, &node.name, field)?,
            NodeKind::SpanStart(span) => {
                span_exists(grammar, span.index())?;
                started.insert(span.index());
            }
            NodeKind::SpanEnd(span) => {
                span_exists(grammar, span.index())?;
                ended.insert(span.index());
            }
            NodeKind::Error { .. } | NodeKind::Pause { .. } => {}
        }
    }

    if let Some(span) = started.difference(&ended).next() {
        return Err(GrammarError::MalformedSpan {
            callback: grammar.spans()[*span].callback.clone(),
            message: "started but never ended".to_string(),
        });
    }
    if let Some(span) = ended.difference(&started).next() {
        return Err(GrammarError::MalformedSpan {
            callback: grammar.spans()[*span].callback.clone(),
            message: "ended but never started".to_string(),
        });
    }

    Ok(())
}

fn require_property(grammar: &Grammar, node: &str, field: &str) -> Result<(), GrammarError> {
    if grammar.property(field).is_none() {
        return Err(GrammarError::UnknownProperty {
            node: node.to_string(),
            property: field.to_string(),
        });
    }
    Ok(())
}

fn span_exists(grammar: &Grammar, index: usize) -> Result<(), GrammarError> {
    if index >= grammar.spans().len() {
        return Err(GrammarError::MalformedSpan {
            callback: format!("span{}", index),
            message: "span is not declared".to_string(),
        });
    }
    Ok(())
}
