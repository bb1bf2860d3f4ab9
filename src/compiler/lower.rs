//! Lowering of grammar nodes into byte-level states
//!
//! Match nodes with multi-byte keys become tries. A trie level where only one
//! key continues collapses into a `Sequence` state; a key that ends where a
//! longer one continues becomes the otherwise branch of the deeper level.

use crate::grammar::{Code, Edge, Grammar, NodeId, NodeKind, Transform};
use std::collections::{BTreeMap, HashMap};

pub(crate) type StateId = usize;

/// Transfer of control with optional consumption and `match` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Jump {
    pub target: StateId,
    pub consume: bool,
    pub value: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum StateKind {
    Single {
        transform: Option<Transform>,
        edges: Vec<(u8, Jump)>,
        otherwise: Jump,
    },
    Sequence {
        transform: Option<Transform>,
        bytes: Vec<u8>,
        on_match: Jump,
        otherwise: Jump,
    },
    Invoke {
        code: Code,
        map: Vec<(i64, StateId)>,
        otherwise: StateId,
    },
    SpanStart {
        span: usize,
        next: StateId,
    },
    SpanEnd {
        span: usize,
        next: StateId,
    },
    Consume {
        field: String,
        next: StateId,
    },
    Error {
        code: i32,
        reason: String,
    },
    Pause {
        code: i32,
        reason: String,
        next: StateId,
    },
}

impl StateKind {
    /// Rewrite every target through `f`.
    pub(crate) fn map_targets(&self, f: impl Fn(StateId) -> StateId) -> StateKind {
        let jump = |j: &Jump| Jump {
            target: f(j.target),
            ..*j
        };
        match self {
            StateKind::Single {
                transform,
                edges,
                otherwise,
            } => StateKind::Single {
                transform: *transform,
                edges: edges.iter().map(|(b, j)| (*b, jump(j))).collect(),
                otherwise: jump(otherwise),
            },
            StateKind::Sequence {
                transform,
                bytes,
                on_match,
                otherwise,
            } => StateKind::Sequence {
                transform: *transform,
                bytes: bytes.clone(),
                on_match: jump(on_match),
                otherwise: jump(otherwise),
            },
            StateKind::Invoke { code, map, otherwise } => StateKind::Invoke {
                code: code.clone(),
                map: map.iter().map(|(v, t)| (*v, f(*t))).collect(),
                otherwise: f(*otherwise),
            },
            StateKind::SpanStart { span, next } => StateKind::SpanStart {
                span: *span,
                next: f(*next),
            },
            StateKind::SpanEnd { span, next } => StateKind::SpanEnd {
                span: *span,
                next: f(*next),
            },
            StateKind::Consume { field, next } => StateKind::Consume {
                field: field.clone(),
                next: f(*next),
            },
            StateKind::Error { code, reason } => StateKind::Error {
                code: *code,
                reason: reason.clone(),
            },
            StateKind::Pause { code, reason, next } => StateKind::Pause {
                code: *code,
                reason: reason.clone(),
                next: f(*next),
            },
        }
    }

    /// States that read input and may suspend at the end of a buffer.
    pub(crate) fn reads_input(&self) -> bool {
        matches!(
            self,
            StateKind::Single { .. } | StateKind::Sequence { .. } | StateKind::Consume { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct State {
    pub name: String,
    pub kind: StateKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Machine {
    pub states: Vec<State>,
    pub entry: StateId,
}

struct Branch<'a> {
    rest: &'a [u8],
    edge: &'a Edge,
}

struct Lowering<'g> {
    grammar: &'g Grammar,
    ids: HashMap<NodeId, StateId>,
    states: Vec<State>,
}

pub(crate) fn lower(grammar: &Grammar) -> Machine {
    let reachable = grammar.reachable();
    let mut lowering = Lowering {
        grammar,
        ids: HashMap::new(),
        states: Vec::new(),
    };

    // Reserve one slot per node so forward references resolve.
    for id in &reachable {
        lowering.ids.insert(*id, lowering.states.len());
        lowering.states.push(State {
            name: grammar.node(*id).name.clone(),
            kind: StateKind::Error {
                code: 0,
                reason: String::new(),
            },
        });
    }
    for id in &reachable {
        lowering.lower_node(*id);
    }

    Machine {
        entry: lowering.ids[&grammar.entry()],
        states: lowering.states,
    }
}

impl<'g> Lowering<'g> {
    fn target(&self, node: NodeId) -> StateId {
        self.ids[&node]
    }

    fn next(&self, node: NodeId) -> StateId {
        // Validation guarantees every reachable non-terminal node has one.
        let otherwise = self.grammar.node(node).otherwise;
        otherwise.map(|o| self.target(o.target)).unwrap_or(self.ids[&node])
    }

    fn lower_node(&mut self, id: NodeId) {
        let slot = self.ids[&id];
        let grammar = self.grammar;
        let node = grammar.node(id);
        let kind = match &node.kind {
            NodeKind::Match { edges, transform } => {
                let fallback = match node.otherwise {
                    Some(o) => Jump {
                        target: self.target(o.target),
                        consume: o.skip,
                        value: None,
                    },
                    None => Jump {
                        target: slot,
                        consume: false,
                        value: None,
                    },
                };
                let branches = edges
                    .iter()
                    .map(|edge| Branch {
                        rest: edge.key.as_slice(),
                        edge,
                    })
                    .collect();
                let base = node.name.clone();
                let mut counter = 0;
                self.trie(slot, &base, &mut counter, branches, fallback, *transform);
                return;
            }
            NodeKind::Invoke { code, map } => StateKind::Invoke {
                code: code.clone(),
                map: map.iter().map(|(v, t)| (*v, self.target(*t))).collect(),
                otherwise: self.next(id),
            },
            NodeKind::SpanStart(span) => StateKind::SpanStart {
                span: span.index(),
                next: self.next(id),
            },
            NodeKind::SpanEnd(span) => StateKind::SpanEnd {
                span: span.index(),
                next: self.next(id),
            },
            NodeKind::Consume(field) => StateKind::Consume {
                field: field.clone(),
                next: self.next(id),
            },
            NodeKind::Error { code, reason } => StateKind::Error {
                code: *code,
                reason: reason.clone(),
            },
            NodeKind::Pause { code, reason } => StateKind::Pause {
                code: *code,
                reason: reason.clone(),
                next: self.next(id),
            },
        };
        self.states[slot].kind = kind;
    }

    fn trie(
        &mut self,
        slot: StateId,
        base: &str,
        counter: &mut usize,
        branches: Vec<Branch<'g>>,
        fallback: Jump,
        transform: Option<Transform>,
    ) {
        if let [only] = branches.as_slice() {
            if only.rest.len() > 1 && only.edge.consume {
                self.states[slot].kind = StateKind::Sequence {
                    transform,
                    bytes: only.rest.to_vec(),
                    on_match: Jump {
                        target: self.target(only.edge.target),
                        consume: true,
                        value: only.edge.value,
                    },
                    otherwise: fallback,
                };
                return;
            }
        }

        let mut groups: BTreeMap<u8, Vec<Branch<'g>>> = BTreeMap::new();
        for branch in branches {
            groups.entry(branch.rest[0]).or_default().push(branch);
        }

        let mut edges = Vec::new();
        for (byte, group) in groups {
            let (terminal, deeper): (Vec<_>, Vec<_>) = group.into_iter().partition(|b| b.rest.len() == 1);

            if deeper.is_empty() {
                if let Some(end) = terminal.first() {
                    edges.push((
                        byte,
                        Jump {
                            target: self.target(end.edge.target),
                            consume: end.edge.consume,
                            value: end.edge.value,
                        },
                    ));
                }
                continue;
            }

            let child_fallback = match terminal.first() {
                Some(end) => Jump {
                    target: self.target(end.edge.target),
                    consume: false,
                    value: end.edge.value,
                },
                None => fallback,
            };

            *counter += 1;
            let child = self.states.len();
            self.states.push(State {
                name: format!("{}_{}", base, counter),
                kind: StateKind::Error {
                    code: 0,
                    reason: String::new(),
                },
            });
            edges.push((
                byte,
                Jump {
                    target: child,
                    consume: true,
                    value: None,
                },
            ));

            let rest = deeper
                .into_iter()
                .map(|b| Branch {
                    rest: &b.rest[1..],
                    edge: b.edge,
                })
                .collect();
            self.trie(child, base, counter, rest, child_fallback, transform);
        }

        self.states[slot].kind = StateKind::Single {
            transform,
            edges,
            otherwise: fallback,
        };
    }
}
