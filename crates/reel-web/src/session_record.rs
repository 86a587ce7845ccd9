#![forbid(unsafe_code)]

//! Deterministic recording and replay of drag-handle sessions.
//!
//! [`HandleRecorder`] wraps a [`DragHandle`] and records every signal it
//! receives together with a checkpoint per dispatch. [`replay`] feeds the
//! same signals through a fresh handle and compares checkpoints.
//!
//! # Trace layout
//!
//! One JSON object per line (JSONL), tagged by `record`:
//!
//! - **header**: schema, item id, index, and the hold-preference flag
//!   captured when recording began.
//! - **input** / **tick** / **unmount**: timestamped handle signals.
//! - **step**: FNV-1a checksum of the dispatch (intents, commands, resulting
//!   phase) and of the drag-owned document state (suppression markers, card
//!   inline styles), plus the running checksum chain.
//! - **summary**: step count and final chain.
//!
//! The preference flag is snapshotted so a replay selects the same hold
//! profile regardless of what the store holds at replay time.

use std::fmt;
use std::time::Duration;

use reel_core::config::{GestureConfig, GestureConfigError};
use reel_core::event::HandleInput;
use reel_core::logging::LOG_TARGET;
use reel_core::preference::{MemoryPreferences, PreferenceStore};
use serde::{Deserialize, Serialize};

use crate::dom::{
    ATTR_DRAG_ACTIVE, ATTR_INDEX, Document, ElementId, STYLE_POINTER_EVENTS, STYLE_TRANSFORM,
    STYLE_TRANSITION, STYLE_Z_INDEX,
};
use crate::drag_handle::{DragHandle, HandleDispatch};

/// Trace schema identifier.
pub const SCHEMA_VERSION: &str = "reel-handle-trace-v2";

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

fn fnv1a64_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn fnv1a64_pair(prev: u64, next: u64) -> u64 {
    let hash = fnv1a64_bytes(FNV_OFFSET_BASIS, &prev.to_le_bytes());
    fnv1a64_bytes(hash, &next.to_le_bytes())
}

const CARD_STYLES: [&str; 3] = [STYLE_Z_INDEX, STYLE_TRANSITION, STYLE_TRANSFORM];

fn fnv1a64_style(hash: u64, doc: &Document, element: ElementId, property: &str) -> u64 {
    match doc.style(element, property) {
        Some(value) => fnv1a64_bytes(fnv1a64_bytes(hash, &[1]), value.as_bytes()),
        None => fnv1a64_bytes(hash, &[0]),
    }
}

/// Checksum of the document state a drag owns: every suppression marker
/// with its `pointer-events` override, and the drag styles of every card.
#[must_use]
pub fn document_checksum(doc: &Document) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for region in doc.query_all_with_attribute(ATTR_DRAG_ACTIVE) {
        hash = fnv1a64_bytes(hash, &region.raw().to_le_bytes());
        hash = fnv1a64_style(hash, doc, region, STYLE_POINTER_EVENTS);
    }
    for card in doc.query_all_with_attribute(ATTR_INDEX) {
        hash = fnv1a64_bytes(hash, &card.raw().to_le_bytes());
        for property in CARD_STYLES {
            hash = fnv1a64_style(hash, doc, card, property);
        }
    }
    hash
}

/// Checksum of everything a dispatch makes observable to the host,
/// including the document state it leaves behind.
pub fn dispatch_checksum(dispatch: &HandleDispatch, doc: &Document) -> Result<u64, TraceError> {
    let intents = serde_json::to_vec(&dispatch.intents).map_err(TraceError::Json)?;
    let commands = serde_json::to_vec(&dispatch.commands).map_err(TraceError::Json)?;
    let hash = fnv1a64_bytes(FNV_OFFSET_BASIS, &intents);
    let hash = fnv1a64_bytes(hash, &commands);
    let hash = fnv1a64_bytes(hash, dispatch.log.phase_after.as_str().as_bytes());
    Ok(fnv1a64_pair(hash, document_checksum(doc)))
}

fn duration_ns(at: Duration) -> u64 {
    u64::try_from(at.as_nanos()).unwrap_or(u64::MAX)
}

/// A single record in a handle trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum TraceRecord {
    Header {
        schema: String,
        item_id: String,
        index: usize,
        hold_flag: Option<String>,
    },
    Input {
        ts_ns: u64,
        input: HandleInput,
    },
    Tick {
        ts_ns: u64,
    },
    Unmount {
        ts_ns: u64,
    },
    Step {
        step_idx: u64,
        checksum: u64,
        checksum_chain: u64,
    },
    Summary {
        total_steps: u64,
        final_checksum_chain: u64,
    },
}

/// A complete recorded trace.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HandleTrace {
    pub records: Vec<TraceRecord>,
}

impl HandleTrace {
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.records
            .iter()
            .filter(|r| matches!(r, TraceRecord::Step { .. }))
            .count() as u64
    }

    #[must_use]
    pub fn final_checksum_chain(&self) -> Option<u64> {
        self.records.iter().rev().find_map(|r| match r {
            TraceRecord::Summary {
                final_checksum_chain,
                ..
            } => Some(*final_checksum_chain),
            _ => None,
        })
    }

    /// Serialize as JSON lines.
    pub fn to_jsonl(&self) -> Result<String, TraceError> {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&serde_json::to_string(record).map_err(TraceError::Json)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Parse JSON lines. Blank lines are skipped.
    pub fn from_jsonl(input: &str) -> Result<Self, TraceError> {
        let records = input
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(TraceError::Json))
            .collect::<Result<Vec<TraceRecord>, _>>()?;
        Ok(Self { records })
    }
}

/// Records a handle session for deterministic replay.
#[derive(Debug)]
pub struct HandleRecorder {
    handle: DragHandle,
    prefs: MemoryPreferences,
    records: Vec<TraceRecord>,
    step_idx: u64,
    checksum_chain: u64,
}

impl HandleRecorder {
    /// Start recording. The hold-preference flag is read from `prefs` once.
    #[must_use]
    pub fn new(handle: DragHandle, prefs: &dyn PreferenceStore) -> Self {
        let key = handle.config().hold_preference_key.clone();
        let hold_flag = prefs.get(&key);
        let snapshot = match &hold_flag {
            Some(flag) => MemoryPreferences::new().with(&key, flag),
            None => MemoryPreferences::new(),
        };
        let header = TraceRecord::Header {
            schema: SCHEMA_VERSION.to_owned(),
            item_id: handle.item_id().to_owned(),
            index: handle.index(),
            hold_flag,
        };
        Self {
            handle,
            prefs: snapshot,
            records: vec![header],
            step_idx: 0,
            checksum_chain: 0,
        }
    }

    #[must_use]
    pub fn handle(&self) -> &DragHandle {
        &self.handle
    }

    /// Record and dispatch one handle input.
    pub fn input(
        &mut self,
        doc: &mut Document,
        input: HandleInput,
        now: Duration,
    ) -> Result<HandleDispatch, TraceError> {
        self.records.push(TraceRecord::Input {
            ts_ns: duration_ns(now),
            input: input.clone(),
        });
        let dispatch = self.handle.handle(doc, &self.prefs, input, now);
        self.checkpoint(&dispatch, doc)?;
        Ok(dispatch)
    }

    /// Record and perform a deadline poll.
    pub fn tick(&mut self, doc: &mut Document, now: Duration) -> Result<HandleDispatch, TraceError> {
        self.records.push(TraceRecord::Tick {
            ts_ns: duration_ns(now),
        });
        let dispatch = self.handle.tick(doc, now);
        self.checkpoint(&dispatch, doc)?;
        Ok(dispatch)
    }

    /// Record and perform teardown.
    pub fn unmount(
        &mut self,
        doc: &mut Document,
        now: Duration,
    ) -> Result<HandleDispatch, TraceError> {
        self.records.push(TraceRecord::Unmount {
            ts_ns: duration_ns(now),
        });
        let dispatch = self.handle.unmount(doc, now);
        self.checkpoint(&dispatch, doc)?;
        Ok(dispatch)
    }

    /// Finish recording and return the trace.
    #[must_use]
    pub fn finish(mut self) -> HandleTrace {
        self.records.push(TraceRecord::Summary {
            total_steps: self.step_idx,
            final_checksum_chain: self.checksum_chain,
        });
        HandleTrace {
            records: self.records,
        }
    }

    fn checkpoint(&mut self, dispatch: &HandleDispatch, doc: &Document) -> Result<(), TraceError> {
        let checksum = dispatch_checksum(dispatch, doc)?;
        self.checksum_chain = fnv1a64_pair(self.checksum_chain, checksum);
        self.records.push(TraceRecord::Step {
            step_idx: self.step_idx,
            checksum,
            checksum_chain: self.checksum_chain,
        });
        self.step_idx += 1;
        Ok(())
    }
}

/// Result of replaying a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayResult {
    pub total_steps: u64,
    pub final_checksum_chain: u64,
    pub first_mismatch: Option<ReplayMismatch>,
}

impl ReplayResult {
    /// Whether every checkpoint matched.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.first_mismatch.is_none()
    }
}

/// First checkpoint that diverged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayMismatch {
    pub step_idx: u64,
    pub expected: u64,
    pub actual: u64,
}

/// Trace encoding and replay errors.
#[derive(Debug)]
pub enum TraceError {
    /// The first record is not a header.
    MissingHeader,
    /// The header names a schema this build does not understand.
    SchemaMismatch { found: String },
    /// A step checkpoint without a preceding signal.
    OrphanStep { step_idx: u64 },
    Json(serde_json::Error),
    Config(GestureConfigError),
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "trace missing header record"),
            Self::SchemaMismatch { found } => {
                write!(f, "unsupported trace schema {found:?}, expected {SCHEMA_VERSION:?}")
            }
            Self::OrphanStep { step_idx } => {
                write!(f, "step {step_idx} has no preceding input, tick or unmount")
            }
            Self::Json(e) => write!(f, "trace JSON error: {e}"),
            Self::Config(e) => write!(f, "replay configuration rejected: {e}"),
        }
    }
}

impl std::error::Error for TraceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GestureConfigError> for TraceError {
    fn from(e: GestureConfigError) -> Self {
        Self::Config(e)
    }
}

/// Replay `trace` through a fresh handle mounted on `element` in `doc`.
///
/// `doc` must have the same layout the recording used; hover resolution
/// reads it.
pub fn replay(
    trace: &HandleTrace,
    config: GestureConfig,
    doc: &mut Document,
    element: ElementId,
) -> Result<ReplayResult, TraceError> {
    let Some(TraceRecord::Header {
        schema,
        item_id,
        index,
        hold_flag,
    }) = trace.records.first()
    else {
        return Err(TraceError::MissingHeader);
    };
    if schema != SCHEMA_VERSION {
        return Err(TraceError::SchemaMismatch {
            found: schema.clone(),
        });
    }

    let prefs = match hold_flag {
        Some(flag) => MemoryPreferences::new().with(&config.hold_preference_key, flag),
        None => MemoryPreferences::new(),
    };
    let mut handle = DragHandle::new(config, element, item_id.clone(), *index)?;

    let mut pending: Option<u64> = None;
    let mut total_steps = 0;
    let mut checksum_chain = 0;
    let mut first_mismatch = None;

    for record in &trace.records[1..] {
        let dispatch = match record {
            TraceRecord::Input { ts_ns, input } => {
                handle.handle(doc, &prefs, input.clone(), Duration::from_nanos(*ts_ns))
            }
            TraceRecord::Tick { ts_ns } => handle.tick(doc, Duration::from_nanos(*ts_ns)),
            TraceRecord::Unmount { ts_ns } => handle.unmount(doc, Duration::from_nanos(*ts_ns)),
            TraceRecord::Step {
                step_idx,
                checksum: expected,
                ..
            } => {
                let actual = pending
                    .take()
                    .ok_or(TraceError::OrphanStep { step_idx: *step_idx })?;
                checksum_chain = fnv1a64_pair(checksum_chain, actual);
                total_steps += 1;
                if actual != *expected && first_mismatch.is_none() {
                    tracing::warn!(
                        target: LOG_TARGET,
                        step_idx,
                        expected,
                        actual,
                        "replay diverged"
                    );
                    first_mismatch = Some(ReplayMismatch {
                        step_idx: *step_idx,
                        expected: *expected,
                        actual,
                    });
                }
                continue;
            }
            TraceRecord::Header { .. } | TraceRecord::Summary { .. } => continue,
        };
        pending = Some(dispatch_checksum(&dispatch, doc)?);
    }

    Ok(ReplayResult {
        total_steps,
        final_checksum_chain: checksum_chain,
        first_mismatch,
    })
}
