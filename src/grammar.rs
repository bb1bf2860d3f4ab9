//! Grammar graph: the declarative description the compiler consumes
//!
//! A grammar is an arena of nodes reachable from one entry node. Match nodes
//! branch on input bytes, invoke nodes run a [`Code`] and dispatch on its
//! result, span nodes bracket byte ranges reported through callbacks, and
//! error/pause nodes stop execution. Grammars are built with [`Builder`] and
//! are immutable afterwards.

pub mod builder;
pub mod code;
pub mod node;

pub use builder::Builder;
pub use code::Code;
pub use node::{Edge, Node, NodeId, NodeKind, Otherwise, Property, PropertyType, Span, SpanId, Transform};

/// A builder call that could not be honored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderMisuse {
    pub node: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) prefix: String,
    pub(crate) nodes: Vec<Node>,
    pub(crate) spans: Vec<Span>,
    pub(crate) properties: Vec<Property>,
    pub(crate) entry: NodeId,
    pub(crate) misuse: Vec<BuilderMisuse>,
}

impl Grammar {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn misuse(&self) -> &[BuilderMisuse] {
        &self.misuse
    }

    /// Node ids reachable from the entry, in breadth-first discovery order.
    pub fn reachable(&self) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut queue = std::collections::VecDeque::new();
        if self.entry.0 < self.nodes.len() {
            seen[self.entry.0] = true;
            queue.push_back(self.entry);
        }
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for next in self.node(id).successors() {
                if !seen[next.0] {
                    seen[next.0] = true;
                    queue.push_back(next);
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reachable_in_discovery_order() {
        let mut b = Builder::new("p");
        let a = b.node("a");
        let c = b.node("c");
        let bb = b.node("b");
        let orphan = b.node("orphan");
        b.on(a, "x", bb).otherwise(a, c);
        b.otherwise(bb, a);
        b.otherwise(c, a);
        b.otherwise(orphan, a);
        let g = b.build(a);

        assert_eq!(g.reachable(), vec![a, bb, c]);
        assert!(!g.reachable().contains(&orphan));
    }
}
