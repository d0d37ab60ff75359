use crate::error::{Error, Result};
use crate::events::base::{BaseEvent, EventPayload};
use crate::types::timestamp::Timestamp;

/// Append-only, in-memory record of everything the engine published.
/// Sequences start at 1 and never repeat, including across a restore.
#[derive(Default)]
pub struct EventLog {
    events: Vec<BaseEvent>,
    last_sequence: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues numbering after `last_sequence`; earlier events live in
    /// whatever consumed them before the snapshot.
    pub fn resume_after(last_sequence: u64) -> Self {
        EventLog {
            events: Vec::new(),
            last_sequence,
        }
    }

    pub fn append(&mut self, payload: EventPayload, now: Timestamp) -> u64 {
        let mut event = BaseEvent::new(payload.event_type(), now, payload);
        self.last_sequence += 1;
        event.sequence = self.last_sequence;
        event.checksum = event.calculate_checksum();

        tracing::debug!(
            "Event {} appended: {:?} position={:?}",
            event.sequence,
            event.event_type,
            event.position_id
        );
        self.events.push(event);
        self.last_sequence
    }

    pub fn events(&self) -> &[BaseEvent] {
        &self.events
    }

    pub fn since(&self, sequence: u64) -> impl Iterator<Item = &BaseEvent> {
        self.events.iter().filter(move |e| e.sequence > sequence)
    }

    /// One JSON object per line for every event after `sequence`.
    pub fn to_json_lines(&self, sequence: u64) -> Result<String> {
        let mut out = String::new();
        for event in self.since(sequence) {
            let line = serde_json::to_string(event).map_err(|e| Error::SerializationError(e.to_string()))?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
