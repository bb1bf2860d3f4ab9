//! Moore-style partition refinement over lowered states

use super::lower::{Machine, State, StateKind};
use std::collections::HashMap;

/// Merge states that are indistinguishable: same shape, same outputs and
/// transitions into equivalent states. Representatives keep the name and the
/// relative order of the first state of their class.
pub(crate) fn minimize(machine: Machine) -> Machine {
    let n = machine.states.len();
    let mut class = vec![0usize; n];
    let mut classes = 1;

    loop {
        let mut table: HashMap<(usize, StateKind), usize> = HashMap::new();
        let mut next = vec![0usize; n];
        for (i, state) in machine.states.iter().enumerate() {
            let signature = (class[i], state.kind.map_targets(|t| class[t]));
            let fresh = table.len();
            next[i] = *table.entry(signature).or_insert(fresh);
        }
        let refined = table.len();
        class = next;
        if refined == classes {
            break;
        }
        classes = refined;
    }

    let mut states: Vec<State> = Vec::with_capacity(classes);
    for (i, state) in machine.states.iter().enumerate() {
        if class[i] == states.len() {
            states.push(State {
                name: state.name.clone(),
                kind: state.kind.map_targets(|t| class[t]),
            });
        }
    }

    Machine {
        entry: class[machine.entry],
        states,
    }
}
