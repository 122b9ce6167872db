//! Runs properties: replay stored failures, explore with parallel workers,
//! shrink what they find, deduplicate, persist, report.

mod worker;

pub use worker::{Origin, worker_seed};

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::AtomicUsize;
use std::thread;
use std::time::Instant;

use chrono::Utc;
use crossbeam_channel::unbounded;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::HarnessConfig;
use crate::generator::{CancelToken, GenConfig, Trace};
use crate::oracle::{Evidence, Verdict, ViolationKind};
use crate::property::{CaseOutcome, Checkable};
use crate::report::{PropertyReport, RunReport};
use crate::shrink::shrink;
use crate::store::{FailureStore, StoredFailure};
use worker::{Found, Shared, run_worker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustReason {
    Deadline,
    Cancelled,
    TooManyRejections,
}

impl fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExhaustReason::Deadline => write!(f, "deadline reached"),
            ExhaustReason::Cancelled => write!(f, "cancelled"),
            ExhaustReason::TooManyRejections => write!(f, "too many rejected examples"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Counterexample {
    pub trace: Trace,
    pub input: String,
}

/// A failure after shrinking. `evidence` describes the minimized input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub property: String,
    pub original: Counterexample,
    pub minimized: Counterexample,
    pub evidence: Evidence,
    pub shrink_attempts: usize,
    pub origin: Origin,
}

impl FailureRecord {
    pub fn kind(&self) -> ViolationKind {
        self.evidence.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PropertyState {
    Pending,
    Running { examples: usize },
    Passed { examples: usize },
    /// Distinct minimized failures, first-found first.
    Failed { failures: Vec<FailureRecord> },
    /// Stopped early without a violation.
    Exhausted { examples: usize, reason: ExhaustReason },
}

impl PropertyState {
    pub fn name(&self) -> &'static str {
        match self {
            PropertyState::Pending => "pending",
            PropertyState::Running { .. } => "running",
            PropertyState::Passed { .. } => "passed",
            PropertyState::Failed { .. } => "failed",
            PropertyState::Exhausted { .. } => "exhausted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PropertyState::Passed { .. }
                | PropertyState::Failed { .. }
                | PropertyState::Exhausted { .. }
        )
    }

    pub fn can_advance_to(&self, next: &PropertyState) -> bool {
        match self {
            PropertyState::Pending => matches!(next, PropertyState::Running { .. }),
            PropertyState::Running { .. } => !matches!(next, PropertyState::Pending),
            _ => false,
        }
    }

    /// The first failure, which the report shows as primary evidence.
    pub fn primary_failure(&self) -> Option<&FailureRecord> {
        match self {
            PropertyState::Failed { failures } => failures.first(),
            _ => None,
        }
    }
}

fn advance(state: &mut PropertyState, next: PropertyState, property: &str) {
    debug_assert!(state.can_advance_to(&next), "{} -> {}", state.name(), next.name());
    debug!(property, from = state.name(), to = next.name(), "property state");
    *state = next;
}

pub struct Harness {
    config: HarnessConfig,
    gen_config: GenConfig,
    store: Option<FailureStore>,
    interrupt: CancelToken,
    run_id: Uuid,
    seed: u64,
}

impl Harness {
    /// A harness for one run. The seed is taken from the config or drawn at
    /// random; either way it is reported so the run can be repeated.
    pub fn new(config: HarnessConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let store = config.database.as_ref().and_then(|root| match FailureStore::open(root) {
            Ok(store) => Some(store),
            Err(err) => {
                warn!(
                    path = %root.display(),
                    %err,
                    "failure database unavailable; keeping failures in memory"
                );
                None
            }
        });
        Self {
            gen_config: GenConfig::from(&config),
            config,
            store,
            interrupt: CancelToken::new(),
            run_id: Uuid::new_v4(),
            seed,
        }
    }

    /// Cancelling `token` stops every property still running; they report
    /// as exhausted.
    pub fn with_interrupt(mut self, token: CancelToken) -> Self {
        self.interrupt = token;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn store(&self) -> Option<&FailureStore> {
        self.store.as_ref()
    }

    pub fn run<'a>(&self, properties: impl IntoIterator<Item = &'a dyn Checkable>) -> RunReport {
        let started_at = Utc::now();
        info!(run_id = %self.run_id, seed = self.seed, "run started");
        let properties = properties.into_iter().map(|p| self.run_property(p)).collect();
        RunReport { run_id: self.run_id, seed: self.seed, started_at, properties }
    }

    pub fn run_property(&self, property: &dyn Checkable) -> PropertyReport {
        let id = property.id();
        let started = Instant::now();
        let mut state = PropertyState::Pending;
        advance(&mut state, PropertyState::Running { examples: 0 }, id);

        let stored = self.load_stored(id);
        let mut found = self.replay_stored(property, &stored);

        let (examples, rejected) = if found.is_empty() {
            self.explore(property, started, &mut found)
        } else {
            (0, 0)
        };
        advance(&mut state, PropertyState::Running { examples }, id);

        let failures = self.minimize_all(property, found);
        let next = if !failures.is_empty() {
            PropertyState::Failed { failures }
        } else if examples >= self.config.max_examples {
            PropertyState::Passed { examples }
        } else if self.interrupt.is_cancelled() {
            PropertyState::Exhausted { examples, reason: ExhaustReason::Cancelled }
        } else if rejected > self.max_rejections() {
            PropertyState::Exhausted { examples, reason: ExhaustReason::TooManyRejections }
        } else {
            PropertyState::Exhausted { examples, reason: ExhaustReason::Deadline }
        };
        advance(&mut state, next, id);

        let elapsed = started.elapsed();
        info!(
            property = id,
            outcome = state.name(),
            examples,
            rejected,
            ?elapsed,
            "property finished"
        );
        PropertyReport {
            id: id.to_string(),
            description: property.description().to_string(),
            shape: property.shape(),
            state,
            examples,
            rejected,
            replayed: stored.len(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    fn max_rejections(&self) -> usize {
        self.config.max_examples.saturating_mul(self.config.max_rejection_ratio)
    }

    fn load_stored(&self, property: &str) -> Vec<StoredFailure> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        store.load(property).unwrap_or_else(|err| {
            warn!(property, %err, "could not read stored failures");
            Vec::new()
        })
    }

    /// Stored traces that still fail. Ones that now pass stay in the store.
    fn replay_stored(&self, property: &dyn Checkable, stored: &[StoredFailure]) -> Vec<Found> {
        let mut found = Vec::new();
        for failure in stored {
            match property.check_trace(&failure.trace, &self.gen_config) {
                Ok(CaseOutcome { trace, rendered, verdict: Verdict::Violate(evidence) }) => {
                    found.push(Found { trace, rendered, evidence, origin: Origin::Stored });
                }
                Ok(_) => debug!(
                    property = property.id(),
                    trace = %failure.trace,
                    "stored failure no longer reproduces"
                ),
                Err(err) => debug!(property = property.id(), %err, "stored trace abandoned"),
            }
        }
        found
    }

    /// Random exploration. Returns the valid and rejected example counts.
    fn explore(
        &self,
        property: &dyn Checkable,
        started: Instant,
        found: &mut Vec<Found>,
    ) -> (usize, usize) {
        let shared = Shared {
            property,
            config: self.gen_config,
            max_examples: self.config.max_examples,
            max_rejections: self.max_rejections(),
            deadline: started.checked_add(self.config.timeout()),
            stop: CancelToken::new(),
            interrupt: &self.interrupt,
            valid: AtomicUsize::new(0),
            rejected: AtomicUsize::new(0),
        };
        let (tx, rx) = unbounded();
        thread::scope(|s| {
            for index in 0..self.config.workers {
                let tx = tx.clone();
                let shared = &shared;
                let seed = self.seed;
                s.spawn(move || run_worker(shared, index, seed, tx));
            }
            drop(tx);
            for failure in rx.iter() {
                shared.stop.cancel();
                debug!(property = property.id(), input = %failure.rendered, "violation found");
                found.push(failure);
            }
        });
        (shared.valid.into_inner(), shared.rejected.into_inner())
    }

    /// Shrink each failure in turn, dropping duplicates of an already
    /// minimized counterexample.
    fn minimize_all(&self, property: &dyn Checkable, found: Vec<Found>) -> Vec<FailureRecord> {
        let mut seen = HashSet::new();
        let mut failures = Vec::new();
        for f in found {
            let record = self.minimize(property, f);
            if !seen.insert(trace_digest(&record.minimized.trace)) {
                debug!(property = property.id(), "duplicate counterexample dropped");
                continue;
            }
            self.persist(&record);
            failures.push(record);
        }
        failures
    }

    fn minimize(&self, property: &dyn Checkable, found: Found) -> FailureRecord {
        let kind = found.evidence.kind();
        let config = &self.gen_config;
        let outcome = shrink(found.trace.clone(), self.config.max_shrink_attempts, |candidate| {
            match property.check_trace(candidate, config) {
                Ok(CaseOutcome { trace, verdict: Verdict::Violate(e), .. }) if e.kind() == kind => {
                    Some(trace)
                }
                _ => None,
            }
        });
        let original = Counterexample { trace: found.trace, input: found.rendered };
        let (minimized, evidence) = match property.check_trace(&outcome.trace, config) {
            Ok(CaseOutcome { trace, rendered, verdict: Verdict::Violate(e) })
                if e.kind() == kind =>
            {
                (Counterexample { trace, input: rendered }, e)
            }
            _ => {
                warn!(
                    property = property.id(),
                    "minimized counterexample did not reproduce; reporting the original"
                );
                (original.clone(), found.evidence)
            }
        };
        FailureRecord {
            property: property.id().to_string(),
            original,
            minimized,
            evidence,
            shrink_attempts: outcome.attempts,
            origin: found.origin,
        }
    }

    fn persist(&self, record: &FailureRecord) {
        let Some(store) = &self.store else {
            return;
        };
        let stored = StoredFailure {
            trace: record.minimized.trace.clone(),
            input: record.minimized.input.clone(),
            kind: record.kind(),
            recorded_at: Utc::now(),
            run_id: self.run_id,
        };
        if let Err(err) = store.record(&record.property, stored) {
            warn!(property = %record.property, %err, "could not persist failure");
        }
    }
}

fn trace_digest(trace: &Trace) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for draw in trace.draws() {
        hasher.update(draw.to_le_bytes());
    }
    hasher.finalize().into()
}
