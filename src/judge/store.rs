//! In-memory outcome store with unit-of-work staging.
//!
//! Durable backends implement [`JudgeUowFactory`](super::JudgeUowFactory)
//! over their own transactions; callers never change.

use std::sync::{Arc, Mutex};

use super::{JudgeError, JudgeOutcome, JudgeUnitOfWork, JudgeUowFactory};

/// Shared in-memory store of committed judge outcomes.
#[derive(Clone, Default)]
pub struct MemoryJudgeStore {
    outcomes: Arc<Mutex<Vec<JudgeOutcome>>>,
}

impl MemoryJudgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed outcomes, oldest first.
    pub fn outcomes(&self) -> Vec<JudgeOutcome> {
        self.outcomes.lock().map(|o| o.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.outcomes.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unit-of-work staging outcomes locally until commit.
struct MemoryJudgeUow {
    store: MemoryJudgeStore,
    staged: Vec<JudgeOutcome>,
}

impl JudgeUnitOfWork for MemoryJudgeUow {
    fn record_outcome(&mut self, outcome: &JudgeOutcome) {
        self.staged.push(outcome.clone());
    }

    fn commit(&mut self) -> Result<(), JudgeError> {
        let mut outcomes = self
            .store
            .outcomes
            .lock()
            .map_err(|_| JudgeError::Commit("outcome store poisoned".to_string()))?;
        outcomes.append(&mut self.staged);
        Ok(())
    }

    fn rollback(&mut self) {
        self.staged.clear();
    }
}

/// Factory producing in-memory units of work over a shared store.
pub struct MemoryJudgeUowFactory {
    store: MemoryJudgeStore,
}

impl MemoryJudgeUowFactory {
    pub fn new(store: MemoryJudgeStore) -> Self {
        Self { store }
    }
}

impl JudgeUowFactory for MemoryJudgeUowFactory {
    fn begin(&self) -> Box<dyn JudgeUnitOfWork> {
        Box::new(MemoryJudgeUow {
            store: self.store.clone(),
            staged: Vec::new(),
        })
    }
}
