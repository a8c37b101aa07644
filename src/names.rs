use crate::constants::*;
use crate::store::SnapshotStore;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Flatten a concatenated string into its display name.
///
/// The rope is walked left to right with an explicit stack, so arbitrarily
/// deep ropes do not recurse. Accumulation stops at
/// [`MAX_CONS_STRING_NAME_LENGTH`] characters. Missing `first`/`second`
/// children are skipped.
pub fn cons_string_name(store: &SnapshotStore, node_index: usize) -> String {
    let layout = store.layout();
    let mut stack: SmallVec<[usize; 16]> = SmallVec::new();
    stack.push(node_index);
    let mut name = String::new();
    let mut name_len = 0;
    // Each rope node is expanded at most this many times in total, which
    // bounds the walk on malformed, cyclic input.
    let mut expansions = store.node_count();

    while name_len < MAX_CONS_STRING_NAME_LENGTH {
        let node_index = match stack.pop() {
            Some(n) => n,
            None => break,
        };
        if store.node_type(node_index) != layout.node_cons_string_type {
            for c in store.node_raw_name(node_index).chars() {
                if name_len == MAX_CONS_STRING_NAME_LENGTH {
                    break;
                }
                name.push(c);
                name_len += 1;
            }
            continue;
        }
        if expansions == 0 {
            warn!("giving up on cyclic concatenated string @{}", store.node_id(node_index));
            break;
        }
        expansions -= 1;

        let mut first = None;
        let mut second = None;
        for edge_index in store.edge_indexes(store.ordinal(node_index)) {
            if first.is_some() && second.is_some() {
                break;
            }
            if store.edge_type(edge_index) != layout.edge_internal_type {
                continue;
            }
            let edge_name = store.edge_name(edge_index);
            if edge_name.is(CONS_STRING_FIRST_EDGE) {
                first = Some(store.edge_to_node(edge_index));
            } else if edge_name.is(CONS_STRING_SECOND_EDGE) {
                second = Some(store.edge_to_node(edge_index));
            }
        }
        stack.extend(second);
        stack.extend(first);
    }
    name
}

/// Per-snapshot cache of flattened names, keyed by ordinal.
#[derive(Debug, Default)]
pub struct NameCache {
    names: Mutex<HashMap<usize, Arc<str>>>,
}

impl NameCache {
    pub fn get_or_resolve(&self, store: &SnapshotStore, node_index: usize) -> Arc<str> {
        let ordinal = store.ordinal(node_index);
        if let Some(name) = self.lock().get(&ordinal) {
            return name.clone();
        }
        // Resolve outside the lock; a racing thread computes the same value.
        let name: Arc<str> = cons_string_name(store, node_index).into();
        self.lock().entry(ordinal).or_insert(name).clone()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<usize, Arc<str>>> {
        // The map is always left consistent, so a poisoned lock is still usable.
        self.names.lock().unwrap_or_else(|e| e.into_inner())
    }
}
