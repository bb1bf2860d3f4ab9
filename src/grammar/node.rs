//! Node arena types for the grammar graph

use super::code::Code;

/// Handle to a node inside a [`Grammar`](super::Grammar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a span (a captured byte range reported through a callback).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanId(pub(crate) usize);

impl SpanId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A span declaration: the callback receives `(state, start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub callback: String,
}

/// Width of a field in the generated parser state struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    I8,
    I16,
    I32,
    I64,
    Ptr,
}

impl PropertyType {
    /// C type used for the struct field.
    pub fn c_type(self) -> &'static str {
        match self {
            PropertyType::I8 => "uint8_t",
            PropertyType::I16 => "uint16_t",
            PropertyType::I32 => "uint32_t",
            PropertyType::I64 => "uint64_t",
            PropertyType::Ptr => "void*",
        }
    }

    /// Largest value an unsigned field of this width can hold.
    pub fn max_value(self) -> Option<u64> {
        match self {
            PropertyType::I8 => Some(0xff),
            PropertyType::I16 => Some(0xffff),
            PropertyType::I32 => Some(0xffff_ffff),
            PropertyType::I64 => Some(u64::MAX),
            PropertyType::Ptr => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub ty: PropertyType,
}

/// Byte transformation applied before comparing input against edge keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    /// `c | 0x20`. Folds ASCII letters to lowercase and leaves digits and
    /// most punctuation untouched; only sound for keys without `@`-`_` range
    /// punctuation.
    ToLowerUnsafe,
}

impl Transform {
    pub fn apply(self, byte: u8) -> u8 {
        match self {
            Transform::ToLowerUnsafe => byte | 0x20,
        }
    }
}

/// A transition out of a match node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub key: Vec<u8>,
    pub target: NodeId,
    /// `false` for a peek: the byte is inspected but not consumed.
    pub consume: bool,
    /// Value handed to the next invoke node as `match`.
    pub value: Option<i64>,
}

/// Continuation taken when no edge matches (or unconditionally, for
/// non-match nodes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Otherwise {
    pub target: NodeId,
    /// Consume the current byte before continuing. Match nodes only.
    pub skip: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Match {
        edges: Vec<Edge>,
        transform: Option<Transform>,
    },
    Invoke {
        code: Code,
        map: Vec<(i64, NodeId)>,
    },
    SpanStart(SpanId),
    SpanEnd(SpanId),
    /// Skip as many bytes as the named field holds.
    Consume(String),
    Error {
        code: i32,
        reason: String,
    },
    Pause {
        code: i32,
        reason: String,
    },
}

impl NodeKind {
    /// Short lowercase label used in generated names and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Match { .. } => "match",
            NodeKind::Invoke { .. } => "invoke",
            NodeKind::SpanStart(_) => "span_start",
            NodeKind::SpanEnd(_) => "span_end",
            NodeKind::Consume(_) => "consume",
            NodeKind::Error { .. } => "error",
            NodeKind::Pause { .. } => "pause",
        }
    }

    /// Error nodes terminate; every other kind needs a continuation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeKind::Error { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub otherwise: Option<Otherwise>,
}

impl Node {
    /// Every node this one can transfer control to, in a stable order.
    pub fn successors(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        match &self.kind {
            NodeKind::Match { edges, .. } => out.extend(edges.iter().map(|e| e.target)),
            NodeKind::Invoke { map, .. } => out.extend(map.iter().map(|(_, t)| *t)),
            _ => {}
        }
        if let Some(o) = self.otherwise {
            out.push(o.target);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_c_types() {
        assert_eq!(PropertyType::I8.c_type(), "uint8_t");
        assert_eq!(PropertyType::I64.c_type(), "uint64_t");
        assert_eq!(PropertyType::Ptr.c_type(), "void*");
        assert_eq!(PropertyType::I16.max_value(), Some(0xffff));
        assert_eq!(PropertyType::Ptr.max_value(), None);
    }

    #[test]
    fn test_to_lower_transform() {
        let t = Transform::ToLowerUnsafe;
        assert_eq!(t.apply(b'C'), b'c');
        assert_eq!(t.apply(b'c'), b'c');
        assert_eq!(t.apply(b'-'), b'-');
        assert_eq!(t.apply(b'7'), b'7');
    }

    #[test]
    fn test_successors_include_otherwise_last() {
        let node = Node {
            name: "n".into(),
            kind: NodeKind::Match {
                edges: vec![Edge {
                    key: b"a".to_vec(),
                    target: NodeId(3),
                    consume: true,
                    value: None,
                }],
                transform: None,
            },
            otherwise: Some(Otherwise {
                target: NodeId(7),
                skip: false,
            }),
        };
        assert_eq!(node.successors(), vec![NodeId(3), NodeId(7)]);
    }
}
