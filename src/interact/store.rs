//! Transform state store
//!
//! In-memory map from diagram id to [`TransformState`], owned by the
//! controller and cleared at the start of every render pass.

use std::collections::HashMap;

use super::types::TransformState;

/// Per-diagram transform states for one rendered document
#[derive(Debug, Clone, Default)]
pub struct TransformStore {
    states: HashMap<String, TransformState>,
}

impl TransformStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for `id`, created with the default on first access
    pub fn get(&mut self, id: &str) -> TransformState {
        *self.states.entry(id.to_string()).or_default()
    }

    /// State for `id` without creating it
    pub fn peek(&self, id: &str) -> Option<TransformState> {
        self.states.get(id).copied()
    }

    /// Replace the state for `id`
    pub fn set(&mut self, id: &str, state: TransformState) {
        self.states.insert(id.to_string(), state);
    }

    /// Restore the default state for `id`
    pub fn reset(&mut self, id: &str) -> TransformState {
        let state = TransformState::default();
        self.set(id, state);
        state
    }

    /// Discard every state; used when the document is re-rendered
    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Number of tracked diagrams
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
