use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::meter::{Meter, Reading};

/// The current value of a label-valued signal, reported as `{label: 1.0}`
/// whenever the label is non-empty.
///
/// Only one label is live at a time; setting a new one replaces the old.
#[derive(Debug, Default)]
pub struct State {
    label: Mutex<String>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current label.
    pub fn change(&self, label: impl Into<String>) {
        *self.label.lock() = label.into();
    }

    /// Clears the current label, so the next read reports nothing.
    pub fn reset(&self) {
        self.label.lock().clear();
    }
}

impl Meter for State {
    fn read(&self, _delta: Duration) -> Reading {
        let label = self.label.lock();
        if label.is_empty() {
            return Vec::new();
        }
        vec![(label.clone(), 1.0)]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_state_reports_nothing() {
        let s = State::new();
        assert!(s.read(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn change_reports_label_as_one() {
        let s = State::new();
        s.change("starting");
        assert_eq!(s.read(Duration::from_secs(1)), vec![("starting".to_string(), 1.0)]);
    }

    #[test]
    fn reset_clears_the_label() {
        let s = State::new();
        s.change("running");
        s.reset();
        assert!(s.read(Duration::from_secs(1)).is_empty());
    }
}
