use serde::{Deserialize, Serialize};
use verdant_enricher::EnricherEvent;
use verdant_farm::FarmEvent;
use verdant_types::EventSink;

/// Event recorded by the runtime, tagged with the component that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "component", content = "payload", rename_all = "snake_case")]
pub enum Event {
    Farm(FarmEvent),
    Enricher(EnricherEvent),
}

/// Append-only log of committed events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Event] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EventSink<FarmEvent> for EventLog {
    fn emit(&mut self, event: FarmEvent) {
        self.entries.push(Event::Farm(event));
    }
}

impl EventSink<EnricherEvent> for EventLog {
    fn emit(&mut self, event: EnricherEvent) {
        self.entries.push(Event::Enricher(event));
    }
}
