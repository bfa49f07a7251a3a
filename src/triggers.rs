//! Timecode triggers
//!
//! Named callbacks bound to a target timecode. A trigger fires once when the
//! output timecode lands exactly on its target and stays fired until a rewind
//! moves the output back before the target, or the signal is lost.

use std::fmt;

use crate::timecode::Timecode;

/// Backwards step, in seconds, that counts as a rewind
const REWIND_THRESHOLD: f64 = 1.0;

/// Callback invoked with the output timecode when a trigger fires
pub type TriggerCallback = Box<dyn FnMut(&Timecode) + Send>;

/// Callback bound to a target timecode
pub struct TimecodeTrigger {
    name: String,
    target: Timecode,
    triggered: bool,
    callback: TriggerCallback,
}

impl TimecodeTrigger {
    pub fn new(name: impl Into<String>, target: Timecode, callback: TriggerCallback) -> Self {
        Self {
            name: name.into(),
            target,
            triggered: false,
            callback,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Timecode {
        self.target
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }
}

impl fmt::Debug for TimecodeTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimecodeTrigger")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("triggered", &self.triggered)
            .finish_non_exhaustive()
    }
}

/// Triggers ordered by target timecode
#[derive(Debug, Default)]
pub struct TriggerMatcher {
    triggers: Vec<TimecodeTrigger>,
    /// Output time seen by the previous evaluation
    last_seconds: Option<f64>,
}

impl TriggerMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trigger, replacing any existing trigger with the same name
    pub fn add(&mut self, name: impl Into<String>, target: Timecode, callback: TriggerCallback) {
        let trigger = TimecodeTrigger::new(name, target, callback);
        self.triggers.retain(|t| t.name != trigger.name);

        let index = self.triggers.partition_point(|t| t.target <= trigger.target);
        self.triggers.insert(index, trigger);
    }

    /// Remove a trigger by name; returns whether one was removed
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.triggers.len();
        self.triggers.retain(|t| t.name != name);
        self.triggers.len() != before
    }

    pub fn clear(&mut self) {
        self.triggers.clear();
        self.last_seconds = None;
    }

    /// Check the current output timecode, firing untriggered exact matches.
    /// Returns the names of the triggers fired.
    pub fn evaluate(&mut self, current: &Timecode) -> Vec<String> {
        let seconds = current.total_seconds();
        if let Some(last) = self.last_seconds {
            if seconds < last - REWIND_THRESHOLD {
                self.rewind(current);
            }
        }
        self.last_seconds = Some(seconds);

        let mut fired = Vec::new();
        for trigger in self.triggers.iter_mut() {
            if trigger.triggered || trigger.target != *current {
                continue;
            }
            trigger.triggered = true;
            (trigger.callback)(current);
            tracing::debug!("Trigger '{}' fired at {}", trigger.name, current);
            fired.push(trigger.name.clone());
        }
        fired
    }

    fn rewind(&mut self, current: &Timecode) {
        let mut rearmed = 0;
        for trigger in self.triggers.iter_mut().filter(|t| t.target > *current) {
            if trigger.triggered {
                rearmed += 1;
            }
            trigger.triggered = false;
        }
        tracing::debug!("Rewind to {}, {} trigger(s) rearmed", current, rearmed);
    }

    /// Rearm every trigger and forget the previous output time
    pub fn reset_all(&mut self) {
        for trigger in self.triggers.iter_mut() {
            trigger.triggered = false;
        }
        self.last_seconds = None;
    }

    pub fn triggers(&self) -> impl Iterator<Item = &TimecodeTrigger> {
        self.triggers.iter()
    }

    pub fn get(&self, name: &str) -> Option<&TimecodeTrigger> {
        self.triggers.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}
