//! The conversation-flow engine: §4.G's substitute for the source's
//! generator coroutines, which Rust has no way to express directly. A flow
//! is a small state machine driven one message at a time; a handler that
//! wants to ask a follow-up question returns a [`Flow`] instead of a final
//! answer, and the engine resumes it with the participant's next message.

use std::collections::VecDeque;

use kzm_core::ids::{Context, Sender};

/// What a resumed flow wants to do next.
pub enum FlowStep {
    /// Send this prompt and wait for the next message from the same
    /// participant.
    Prompt(String),
    /// The flow is finished. `Some(reply)` is sent back exactly like any
    /// other command-handler return value; `None` means "handled, nothing
    /// to say".
    Done(Option<String>),
}

/// A suspended handler, resumed one message at a time.
///
/// `input` is `None` only for the very first call, mirroring the source's
/// rule that the first value sent into a freshly started generator must be
/// `None`.
pub trait Flow: Send {
    fn resume(&mut self, input: Option<&str>) -> FlowStep;
}

struct FlowEntry {
    key: (Context, Sender),
    last_activity: f64,
    flow: Box<dyn Flow>,
}

/// An ordered map from `(context, sender)` to a suspended flow, kept in
/// least-recent-first order by `last_activity` so staleness eviction is a
/// pop from the front.
#[derive(Default)]
pub struct FlowTable {
    entries: VecDeque<FlowEntry>,
}

impl FlowTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry whose `last_activity` is older than `now -
    /// retention_secs`, starting from the front (the oldest). Terminates in
    /// the number of expired entries since the map stays in non-decreasing
    /// `last_activity` order.
    pub fn evict_stale(&mut self, now: f64, retention_secs: f64) {
        let cutoff = now - retention_secs;
        while let Some(front) = self.entries.front() {
            if front.last_activity < cutoff {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn contains(&self, key: (Context, Sender)) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    /// Registers a freshly started flow at the back of the map (it is, by
    /// definition, the most recently active entry).
    pub fn start(&mut self, key: (Context, Sender), now: f64, flow: Box<dyn Flow>) {
        self.entries.push_back(FlowEntry { key, last_activity: now, flow });
    }

    /// Resumes the flow registered under `key`, if any. On a prompt, moves
    /// the entry to the back and refreshes `last_activity`; on completion,
    /// removes it.
    pub fn resume(&mut self, key: (Context, Sender), input: Option<&str>, now: f64) -> Option<FlowStep> {
        let index = self.entries.iter().position(|e| e.key == key)?;
        let mut entry = self.entries.remove(index)?;
        let step = entry.flow.resume(input);
        match &step {
            FlowStep::Prompt(_) => {
                entry.last_activity = now;
                self.entries.push_back(entry);
            }
            FlowStep::Done(_) => {}
        }
        Some(step)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountToThree(u32);

    impl Flow for CountToThree {
        fn resume(&mut self, _input: Option<&str>) -> FlowStep {
            self.0 += 1;
            if self.0 >= 3 {
                FlowStep::Done(Some("done".to_string()))
            } else {
                FlowStep::Prompt(format!("count {}", self.0))
            }
        }
    }

    #[test]
    fn a_flow_survives_prompts_and_is_removed_on_completion() {
        let mut table = FlowTable::new();
        table.start((1, 1), 0.0, Box::new(CountToThree(0)));
        assert!(table.contains((1, 1)));

        match table.resume((1, 1), None, 1.0).unwrap() {
            FlowStep::Prompt(p) => assert_eq!(p, "count 1"),
            _ => panic!("expected a prompt"),
        }
        assert!(table.contains((1, 1)));

        table.resume((1, 1), Some("go"), 2.0);
        match table.resume((1, 1), Some("go"), 3.0).unwrap() {
            FlowStep::Done(Some(reply)) => assert_eq!(reply, "done"),
            _ => panic!("expected completion"),
        }
        assert!(!table.contains((1, 1)));
    }

    #[test]
    fn stale_entries_are_evicted_from_the_front_only() {
        let mut table = FlowTable::new();
        table.start((1, 1), 0.0, Box::new(CountToThree(0)));
        table.start((2, 2), 100.0, Box::new(CountToThree(0)));

        table.evict_stale(86500.0, 86400.0);

        assert!(!table.contains((1, 1)));
        assert!(table.contains((2, 2)));
    }

    #[test]
    fn resuming_an_unknown_key_returns_none() {
        let mut table = FlowTable::new();
        assert!(table.resume((9, 9), None, 0.0).is_none());
    }
}
