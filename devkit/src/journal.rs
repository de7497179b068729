/*!
Journal partagé des effets observables

Relais, télémétrie et afficheur de test écrivent tous ici, dans l'ordre où
les effets se produisent, avec l'instant tokio correspondant (compatible avec
`start_paused`). Permet de vérifier l'ordre "événement puis relais" et les durées.
*/

use parking_lot::Mutex;
use serverroom_gateway::telemetry::TelemetryWrite;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Relay { name: &'static str, on: bool },
    Telemetry(TelemetryWrite),
    Display(String),
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub at: Instant,
    pub record: Record,
}

#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: Record) {
        self.entries.lock().push(JournalEntry { at: Instant::now(), record });
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().clone()
    }

    pub fn records(&self) -> Vec<Record> {
        self.entries.lock().iter().map(|e| e.record.clone()).collect()
    }

    /// Écritures successives d'un relais
    pub fn relay_writes(&self, name: &str) -> Vec<(Instant, bool)> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| match &e.record {
                Record::Relay { name: n, on } if *n == name => Some((e.at, *on)),
                _ => None,
            })
            .collect()
    }

    /// Durée entre la première mise à ON et la mise à OFF suivante
    pub fn pulse_width(&self, name: &str) -> Option<Duration> {
        let writes = self.relay_writes(name);
        let on_at = writes.iter().find(|(_, on)| *on)?.0;
        let off_at = writes.iter().find(|(at, on)| !*on && *at >= on_at)?.0;
        Some(off_at - on_at)
    }

    /// Position (index) du premier enregistrement satisfaisant le prédicat
    pub fn position<F>(&self, predicate: F) -> Option<usize>
    where
        F: Fn(&Record) -> bool,
    {
        self.entries.lock().iter().position(|e| predicate(&e.record))
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
