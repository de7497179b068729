/*!
Télémétrie en mémoire

Remplace la file + store distant : chaque écriture est consignée immédiatement
dans le journal, au moment exact où le contrôleur l'émet.
*/

use crate::journal::{Journal, Record};
use serverroom_gateway::models::{EventLogEntry, EventType, HistorySample, SystemStatus};
use serverroom_gateway::telemetry::{Telemetry, TelemetryWrite};

pub struct RecordingTelemetry {
    journal: Journal,
}

impl RecordingTelemetry {
    pub fn new(journal: &Journal) -> Self {
        Self { journal: journal.clone() }
    }

    fn writes(&self) -> Vec<TelemetryWrite> {
        self.journal
            .records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Telemetry(w) => Some(w),
                _ => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<EventLogEntry> {
        self.writes()
            .into_iter()
            .filter_map(|w| match w {
                TelemetryWrite::Event(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn events_of(&self, kind: EventType) -> Vec<EventLogEntry> {
        self.events().into_iter().filter(|e| e.kind == kind).collect()
    }

    pub fn statuses(&self) -> Vec<SystemStatus> {
        self.writes()
            .into_iter()
            .filter_map(|w| match w {
                TelemetryWrite::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn history(&self) -> Vec<HistorySample> {
        self.writes()
            .into_iter()
            .filter_map(|w| match w {
                TelemetryWrite::History(h) => Some(h),
                _ => None,
            })
            .collect()
    }
}

impl Telemetry for RecordingTelemetry {
    fn set_status(&self, status: SystemStatus) {
        self.journal.push(Record::Telemetry(TelemetryWrite::Status(status)));
    }

    fn append_history(&self, sample: HistorySample) {
        self.journal.push(Record::Telemetry(TelemetryWrite::History(sample)));
    }

    fn append_event(&self, entry: EventLogEntry) {
        self.journal.push(Record::Telemetry(TelemetryWrite::Event(entry)));
    }
}
