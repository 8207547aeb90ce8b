//! Typed overlay events and the in-process bus that delivers them.
//!
//! The wire names keep the camelCase spelling of the original document-level
//! custom events so serialized streams stay compatible with existing
//! consumers.

use crate::geo::GeoBounds;
use crate::geojson::FeatureCollection;
use crate::subgrid::SubCell;
use serde::{Deserialize, Serialize};

/// Event emitted by the overlay components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MapEvent {
    GridToggled {
        visible: bool,
    },
    GridCellSelected {
        bounds: GeoBounds,
    },
    SubgridCellSelected {
        data: SubCell,
    },
    ScanStarted,
    ScanCompleted {
        success: bool,
    },
    RoadMappingStarted,
    RoadMappingCompleted {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<FeatureCollection>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    RoadMappingFailed {
        error: String,
    },
}

impl MapEvent {
    /// Stable wire name of the event kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GridToggled { .. } => "gridToggled",
            Self::GridCellSelected { .. } => "gridCellSelected",
            Self::SubgridCellSelected { .. } => "subgridCellSelected",
            Self::ScanStarted => "scanStarted",
            Self::ScanCompleted { .. } => "scanCompleted",
            Self::RoadMappingStarted => "roadMappingStarted",
            Self::RoadMappingCompleted { .. } => "roadMappingCompleted",
            Self::RoadMappingFailed { .. } => "roadMappingFailed",
        }
    }
}

/// An event plus its per-session sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub event: MapEvent,
}

type Listener = Box<dyn FnMut(&EventRecord)>;

/// Single-threaded dispatch-ordered event bus.
///
/// Listeners run synchronously at emit time; records are additionally kept in
/// a drainable log so tests and the CLI can replay a session's stream.
#[derive(Default)]
pub struct EventBus {
    next_seq: u64,
    listeners: Vec<Listener>,
    records: Vec<EventRecord>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&EventRecord) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Emit an event, returning its sequence number.
    pub fn emit(&mut self, event: MapEvent) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        let record = EventRecord { seq, event };
        for listener in &mut self.listeners {
            listener(&record);
        }
        self.records.push(record);
        seq
    }

    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Take every retained record, leaving the log empty.
    pub fn drain(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.records)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("next_seq", &self.next_seq)
            .field("listeners", &self.listeners.len())
            .field("records", &self.records.len())
            .finish()
    }
}
