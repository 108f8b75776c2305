#![forbid(unsafe_code)]

//! Serializable engine context and the bounded run log.

use std::collections::VecDeque;

use serde::Serialize;

use crate::controller::HeadStats;
use crate::frame::Frame;
use crate::gauge::Gauges;
use crate::geo::GeoCoord;
use crate::lens::Lens;

/// Default number of records kept by a [`RunLog`].
pub const DEFAULT_RUN_LOG_CAPACITY: usize = 64;

/// Name of the scalar reported with every run record.
pub const LENS_METRIC_NAME: &str = "lens_intensity";

/// Point-in-time view of the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSnapshot {
    pub frame: Frame,
    pub observer: GeoCoord,
    pub lens: Lens,
    pub gauges: Gauges,
    pub temperature: f64,
    pub head: HeadStats,
    pub locked: Vec<usize>,
    pub point_count: usize,
    pub seed: u32,
    pub epoch: u64,
    pub tick: u64,
    /// Simulated seconds since the engine was created.
    pub elapsed_secs: f64,
}

/// Discrete interaction that produced a run record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunEvent {
    LockToggled { index: usize, locked: bool },
    LocksCleared,
    LensReleased,
    Reseeded { seed: u32 },
    ConfigApplied,
    FrameToggled { frame: Frame },
    LensKernelChanged,
    MoodToggled { dimension: String },
    /// Explicit request from the host.
    Manual,
}

/// A named scalar computed at record time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReading {
    pub name: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub sequence: u64,
    pub event: RunEvent,
    pub context: ContextSnapshot,
    pub metric: MetricReading,
}

/// Ring buffer of the most recent run records.
#[derive(Debug, Clone)]
pub struct RunLog {
    records: VecDeque<RunRecord>,
    capacity: usize,
    next_sequence: u64,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_RUN_LOG_CAPACITY)
    }
}

impl RunLog {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            next_sequence: 0,
        }
    }

    /// Append a record, evicting the oldest when full.
    pub fn push(&mut self, event: RunEvent, context: ContextSnapshot, metric: f64) -> &RunRecord {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.records.push_back(RunRecord {
            sequence,
            event,
            context,
            metric: MetricReading {
                name: LENS_METRIC_NAME,
                value: metric,
            },
        });
        &self.records[self.records.len() - 1]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&RunRecord> {
        self.records.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunRecord> {
        self.records.iter()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
