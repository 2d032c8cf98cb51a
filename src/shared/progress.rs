//! Progress Record
//!
//! This module defines [`ProgressRecord`], the single value that is kept in
//! memory, written to the local snapshot and upserted to the remote store,
//! together with [`ProgressPatch`] (a partial update) and [`StageLayout`]
//! (how many stages there are and which one is terminal).
//!
//! # Wire format
//!
//! Records serialize to camelCase JSON. The participant name is stored under
//! `teamName`, stage entry times under `stageEntryTimes` keyed by the stage
//! number, and any other key (per-stage puzzle answers) is carried through
//! untouched:
//!
//! ```json
//! {
//!   "teamName": "Alpha",
//!   "currentRoom": 2,
//!   "roomsCompleted": [1, 2],
//!   "startTime": "2024-05-01T18:00:00Z",
//!   "endTime": null,
//!   "stageEntryTimes": { "1": "2024-05-01T18:04:10Z", "2": "2024-05-01T18:11:52Z" },
//!   "room2Answer": "LANTERN"
//! }
//! ```
//!
//! `isLoading` is transient: it is never serialized and an incoming value
//! is ignored. The typed keys above (and `isLoading`) are reserved; a puzzle
//! field with one of those names is dropped rather than written twice.

use crate::shared::config::DEFAULT_STAGE_COUNT;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ops::{Bound, RangeInclusive};

/// JSON keys owned by the typed fields of [`ProgressRecord`]
pub const RESERVED_KEYS: &[&str] = &[
    "teamName",
    "currentRoom",
    "roomsCompleted",
    "startTime",
    "endTime",
    "stageEntryTimes",
    "isLoading",
];

/// Whether `key` names a typed record field and cannot be a puzzle field
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// A participant's progress through the stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Participant/team name; empty until the experience begins
    #[serde(rename = "teamName")]
    pub identity: String,
    /// Highest stage reached
    pub current_room: u32,
    /// Completed stages in completion order, without duplicates
    pub rooms_completed: Vec<u32>,
    /// When the experience began
    pub start_time: Option<DateTime<Utc>>,
    /// When the terminal stage was completed
    pub end_time: Option<DateTime<Utc>>,
    /// First entry time per stage; a missing key is an unset time
    #[serde(with = "stage_times")]
    pub stage_entry_times: BTreeMap<u32, DateTime<Utc>>,
    /// True while the remote record is being fetched
    #[serde(skip_serializing, deserialize_with = "discard_loading_flag")]
    pub is_loading: bool,
    /// Puzzle-specific fields, passed through opaquely; never holds a
    /// [reserved key](RESERVED_KEYS)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProgressRecord {
    /// Empty record for a participant who has not started yet
    pub fn with_identity(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            ..Self::default()
        }
    }

    /// Whether a participant identity has been chosen
    pub fn is_started(&self) -> bool {
        !self.identity.is_empty()
    }

    /// Whether the terminal stage has been reached
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn is_room_completed(&self, stage: u32) -> bool {
        self.rooms_completed.contains(&stage)
    }

    pub fn stage_entry_time(&self, stage: u32) -> Option<DateTime<Utc>> {
        self.stage_entry_times.get(&stage).copied()
    }

    /// Give every completed stage without an entry time the entry time `now`
    pub fn backfill_entry_times(&mut self, now: DateTime<Utc>) {
        for stage in &self.rooms_completed {
            self.stage_entry_times.entry(*stage).or_insert(now);
        }
    }

    /// Time spent since the start, frozen once the record is finished
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        let start = self.start_time?;
        let end = self.end_time.unwrap_or(now);
        Some((end - start).max(Duration::zero()))
    }

    /// Time between entering `stage` and entering the next recorded stage.
    ///
    /// The last recorded stage is bounded by `end_time` instead. Returns
    /// `None` when either bound is unknown.
    pub fn stage_duration(&self, stage: u32) -> Option<Duration> {
        let entered = self.stage_entry_time(stage)?;
        let left = self
            .stage_entry_times
            .range((Bound::Excluded(stage), Bound::Unbounded))
            .next()
            .map(|(_, at)| *at)
            .or(self.end_time)?;
        Some((left - entered).max(Duration::zero()))
    }
}

/// Partial update applied with [`crate::shared::state_machine::apply_update`]
///
/// Every field is optional; omitted fields leave the record unchanged.
/// Fixed timestamps are never overwritten, whatever the patch carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressPatch {
    #[serde(rename = "teamName", skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_room: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms_completed: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(with = "stage_times", skip_serializing_if = "BTreeMap::is_empty")]
    pub stage_entry_times: BTreeMap<u32, DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProgressPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn current_room(mut self, room: u32) -> Self {
        self.current_room = Some(room);
        self
    }

    pub fn rooms_completed(mut self, rooms: Vec<u32>) -> Self {
        self.rooms_completed = Some(rooms);
        self
    }

    pub fn start_time(mut self, at: DateTime<Utc>) -> Self {
        self.start_time = Some(at);
        self
    }

    pub fn end_time(mut self, at: DateTime<Utc>) -> Self {
        self.end_time = Some(at);
        self
    }

    pub fn stage_entry_time(mut self, stage: u32, at: DateTime<Utc>) -> Self {
        self.stage_entry_times.insert(stage, at);
        self
    }

    /// Set an opaque puzzle field. Reserved keys are ignored.
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if is_reserved_key(&key) {
            tracing::debug!("Ignoring puzzle field with reserved name '{}'", key);
            return self;
        }
        self.extra.insert(key, value);
        self
    }
}

/// Numbered stages `1..=stage_count`; the last one is the terminal stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLayout {
    stage_count: u32,
}

impl StageLayout {
    /// Layout with `stage_count` stages; at least one stage always exists
    pub fn new(stage_count: u32) -> Self {
        Self {
            stage_count: stage_count.max(1),
        }
    }

    pub fn stage_count(&self) -> u32 {
        self.stage_count
    }

    pub fn terminal_stage(&self) -> u32 {
        self.stage_count
    }

    pub fn is_terminal(&self, stage: u32) -> bool {
        stage == self.stage_count
    }

    pub fn contains(&self, stage: u32) -> bool {
        self.stages().contains(&stage)
    }

    pub fn stages(&self) -> RangeInclusive<u32> {
        1..=self.stage_count
    }
}

impl Default for StageLayout {
    fn default() -> Self {
        Self::new(DEFAULT_STAGE_COUNT)
    }
}

/// Consume a stored `isLoading` so it never lands among the puzzle fields
fn discard_loading_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde::de::IgnoredAny::deserialize(deserializer)?;
    Ok(false)
}

/// Stage-keyed timestamps as a JSON object with string keys.
///
/// Keys are parsed back into stage numbers; `null` values read as unset.
mod stage_times {
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(times: &BTreeMap<u32, DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(times.iter().map(|(stage, at)| (stage.to_string(), at)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<u32, DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<BTreeMap<String, Option<DateTime<Utc>>>> = Option::deserialize(deserializer)?;
        let mut times = BTreeMap::new();
        for (key, value) in raw.unwrap_or_default() {
            let stage = key
                .trim()
                .parse::<u32>()
                .map_err(|_| D::Error::custom(format!("invalid stage key '{key}'")))?;
            if let Some(at) = value {
                times.insert(stage, at);
            }
        }
        Ok(times)
    }
}
