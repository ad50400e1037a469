//! Thread-safe collection of branch failures.

use std::sync::{Mutex, PoisonError};

use crate::error::{AnalysisError, CombinedError};

/// Records errors from concurrent branches without interrupting them.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Mutex<Vec<AnalysisError>>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, error: AnalysisError) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error);
    }

    pub fn len(&self) -> usize {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the recorded errors as one combined error, or `None` if nothing
    /// was recorded.
    pub fn build(&self) -> Option<CombinedError> {
        let mut guard = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        let errors = std::mem::take(&mut *guard);
        drop(guard);
        if errors.is_empty() {
            None
        } else {
            Some(CombinedError::new(errors))
        }
    }
}
