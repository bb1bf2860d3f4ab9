//! Typed builder for grammar graphs
//!
//! Nodes are created first and wired afterwards, so cycles are expressed by
//! handle:
//!
//! ```text
//! let digits = b.node("digits");
//! b.on_any(digits, "0123456789", digits).otherwise(digits, done);
//! ```
//!
//! The builder never fails. Misuse (an edge on a non-match node, a multi-byte
//! peek, an empty key) is recorded on the grammar and reported by the
//! compiler's validation pass, which keeps grammar code free of `?` noise.

use super::code::Code;
use super::node::{Edge, Node, NodeId, NodeKind, Otherwise, Property, PropertyType, Span, SpanId, Transform};
use super::{BuilderMisuse, Grammar};

pub struct Builder {
    prefix: String,
    nodes: Vec<Node>,
    spans: Vec<Span>,
    properties: Vec<Property>,
    misuse: Vec<BuilderMisuse>,
}

impl Builder {
    /// `prefix` names every generated C symbol (`<prefix>_execute`, ...).
    pub fn new(prefix: impl Into<String>) -> Self {
        Builder {
            prefix: prefix.into(),
            nodes: Vec::new(),
            spans: Vec::new(),
            properties: Vec::new(),
            misuse: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Declare a field of the generated state struct.
    pub fn property(&mut self, ty: PropertyType, name: &str) -> &mut Self {
        if self.properties.iter().any(|p| p.name == name) {
            self.misuse.push(BuilderMisuse {
                node: String::new(),
                message: format!("duplicate property '{}'", name),
            });
        } else {
            self.properties.push(Property {
                name: name.to_string(),
                ty,
            });
        }
        self
    }

    /// A match node: compares input bytes against its edges.
    pub fn node(&mut self, name: &str) -> NodeId {
        self.push(
            name.to_string(),
            NodeKind::Match {
                edges: Vec::new(),
                transform: None,
            },
        )
    }

    pub fn invoke(&mut self, code: Code) -> NodeId {
        let name = format!("invoke_{}", code.helper_name());
        self.push(name, NodeKind::Invoke { code, map: Vec::new() })
    }

    pub fn span(&mut self, callback: &str) -> SpanId {
        self.spans.push(Span {
            callback: callback.to_string(),
        });
        SpanId(self.spans.len() - 1)
    }

    pub fn span_start(&mut self, span: SpanId) -> NodeId {
        let name = format!("span_start_{}", self.span_callback(span));
        self.push(name, NodeKind::SpanStart(span))
    }

    pub fn span_end(&mut self, span: SpanId) -> NodeId {
        let name = format!("span_end_{}", self.span_callback(span));
        self.push(name, NodeKind::SpanEnd(span))
    }

    pub fn consume(&mut self, field: &str) -> NodeId {
        self.push(format!("consume_{}", field), NodeKind::Consume(field.to_string()))
    }

    pub fn error(&mut self, code: i32, reason: &str) -> NodeId {
        self.push(
            "error".to_string(),
            NodeKind::Error {
                code,
                reason: reason.to_string(),
            },
        )
    }

    pub fn pause(&mut self, code: i32, reason: &str) -> NodeId {
        self.push(
            "pause".to_string(),
            NodeKind::Pause {
                code,
                reason: reason.to_string(),
            },
        )
    }

    /// Consume `key` and continue at `target`.
    pub fn on(&mut self, node: NodeId, key: impl AsRef<[u8]>, target: NodeId) -> &mut Self {
        self.add_edge(node, key.as_ref().to_vec(), target, true, None);
        self
    }

    /// One single-byte edge per byte of `set`.
    pub fn on_any(&mut self, node: NodeId, set: impl AsRef<[u8]>, target: NodeId) -> &mut Self {
        for byte in set.as_ref() {
            self.add_edge(node, vec![*byte], target, true, None);
        }
        self
    }

    /// Inspect one byte without consuming it.
    pub fn peek(&mut self, node: NodeId, key: impl AsRef<[u8]>, target: NodeId) -> &mut Self {
        let key = key.as_ref();
        if key.len() != 1 {
            self.record(node, format!("peek key must be a single byte, got {} bytes", key.len()));
            return self;
        }
        self.add_edge(node, key.to_vec(), target, false, None);
        self
    }

    pub fn peek_any(&mut self, node: NodeId, set: impl AsRef<[u8]>, target: NodeId) -> &mut Self {
        for byte in set.as_ref() {
            self.add_edge(node, vec![*byte], target, false, None);
        }
        self
    }

    /// Consume any of the keys, passing the paired value to `target` as `match`.
    pub fn select<K, I>(&mut self, node: NodeId, pairs: I, target: NodeId) -> &mut Self
    where
        K: AsRef<[u8]>,
        I: IntoIterator<Item = (K, i64)>,
    {
        for (key, value) in pairs {
            self.add_edge(node, key.as_ref().to_vec(), target, true, Some(value));
        }
        self
    }

    /// Dispatch an invoke node's return value.
    pub fn map(&mut self, node: NodeId, value: i64, target: NodeId) -> &mut Self {
        match &mut self.nodes[node.0].kind {
            NodeKind::Invoke { map, .. } => map.push((value, target)),
            other => {
                let label = other.label();
                self.record(node, format!("cannot map a return value on a {} node", label));
            }
        }
        self
    }

    pub fn otherwise(&mut self, node: NodeId, target: NodeId) -> &mut Self {
        self.set_otherwise(node, target, false);
        self
    }

    /// Like [`otherwise`](Self::otherwise) but consumes the unmatched byte.
    pub fn skip_to(&mut self, node: NodeId, target: NodeId) -> &mut Self {
        if !matches!(self.nodes[node.0].kind, NodeKind::Match { .. }) {
            self.record(node, "only match nodes can skip input".to_string());
            return self;
        }
        self.set_otherwise(node, target, true);
        self
    }

    pub fn transform(&mut self, node: NodeId, transform: Transform) -> &mut Self {
        match &mut self.nodes[node.0].kind {
            NodeKind::Match { transform: t, .. } => *t = Some(transform),
            _ => self.record(node, "only match nodes accept a transform".to_string()),
        }
        self
    }

    /// Finish the graph with `entry` as the start state.
    pub fn build(self, entry: NodeId) -> Grammar {
        Grammar {
            prefix: self.prefix,
            nodes: self.nodes,
            spans: self.spans,
            properties: self.properties,
            entry,
            misuse: self.misuse,
        }
    }

    fn push(&mut self, name: String, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            name,
            kind,
            otherwise: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    fn span_callback(&self, span: SpanId) -> String {
        self.spans
            .get(span.0)
            .map(|s| s.callback.clone())
            .unwrap_or_else(|| format!("span{}", span.0))
    }

    fn add_edge(&mut self, node: NodeId, key: Vec<u8>, target: NodeId, consume: bool, value: Option<i64>) {
        if key.is_empty() {
            self.record(node, "empty edge key".to_string());
            return;
        }
        match &mut self.nodes[node.0].kind {
            NodeKind::Match { edges, .. } => edges.push(Edge {
                key,
                target,
                consume,
                value,
            }),
            other => {
                let label = other.label();
                self.record(node, format!("cannot add an edge to a {} node", label));
            }
        }
    }

    fn set_otherwise(&mut self, node: NodeId, target: NodeId, skip: bool) {
        let slot = &mut self.nodes[node.0];
        if slot.kind.is_terminal() {
            self.record(node, "error nodes have no continuation".to_string());
            return;
        }
        if slot.otherwise.is_some() {
            self.record(node, "otherwise set twice".to_string());
            return;
        }
        slot.otherwise = Some(Otherwise { target, skip });
    }

    fn record(&mut self, node: NodeId, message: String) {
        self.misuse.push(BuilderMisuse {
            node: self.nodes[node.0].name.clone(),
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_simple_graph() {
        let mut b = Builder::new("p");
        b.property(PropertyType::I8, "method");
        let start = b.node("start");
        let store = b.invoke(Code::Store("method".into()));
        let err = b.error(1, "bad");
        b.select(start, [("GET", 1), ("PUT", 2)], store)
            .otherwise(start, err);
        b.otherwise(store, start);
        let g = b.build(start);

        assert_eq!(g.entry(), start);
        assert_eq!(g.nodes().len(), 3);
        assert!(g.misuse().is_empty());
        match &g.node(start).kind {
            NodeKind::Match { edges, .. } => {
                assert_eq!(edges.len(), 2);
                assert_eq!(edges[1].value, Some(2));
            }
            _ => panic!("Expected match node"),
        }
        assert_eq!(g.node(store).name, "invoke_c_store_method");
    }

    #[test]
    fn test_records_misuse() {
        let mut b = Builder::new("p");
        let start = b.node("start");
        let err = b.error(1, "bad");
        b.on(err, "x", start);
        b.peek(start, "ab", start);
        b.on(start, "", start);
        b.otherwise(err, start);
        b.otherwise(start, err).otherwise(start, err);
        let g = b.build(start);

        let messages: Vec<_> = g.misuse().iter().map(|m| m.message.as_str()).collect();
        assert_eq!(messages.len(), 5);
        assert!(messages[0].contains("cannot add an edge to a error node"));
        assert!(messages[1].contains("single byte"));
        assert_eq!(messages[2], "empty edge key");
        assert_eq!(messages[4], "otherwise set twice");
    }

    #[test]
    fn test_duplicate_property_is_misuse() {
        let mut b = Builder::new("p");
        b.property(PropertyType::I8, "x").property(PropertyType::I16, "x");
        let start = b.node("start");
        let g = b.build(start);
        assert_eq!(g.properties().len(), 1);
        assert_eq!(g.misuse().len(), 1);
    }

    #[test]
    fn test_span_node_names_use_callback() {
        let mut b = Builder::new("p");
        let url = b.span("p__on_url");
        let s = b.span_start(url);
        let e = b.span_end(url);
        let g = b.build(s);
        assert_eq!(g.node(s).name, "span_start_p__on_url");
        assert_eq!(g.node(e).name, "span_end_p__on_url");
    }
}
