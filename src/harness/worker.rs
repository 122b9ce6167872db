use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::diagnostics::Abandoned;
use crate::generator::{CancelToken, DrawSource, GenConfig, Trace};
use crate::oracle::{Evidence, Verdict};
use crate::property::Checkable;

/// Where a failing example came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Replayed from the failure database.
    Stored,
    /// Generated from this per-example seed.
    Seed(u64),
}

/// A failing example, before shrinking.
#[derive(Debug, Clone)]
pub(crate) struct Found {
    pub trace: Trace,
    pub rendered: String,
    pub evidence: Evidence,
    pub origin: Origin,
}

/// State shared by the workers exploring one property.
pub(crate) struct Shared<'a> {
    pub property: &'a dyn Checkable,
    pub config: GenConfig,
    pub max_examples: usize,
    pub max_rejections: usize,
    /// `None` when the timeout reaches past what `Instant` can represent.
    pub deadline: Option<Instant>,
    /// Set on the first violation; aborts in-flight generation.
    pub stop: CancelToken,
    /// Run-wide interruption requested by the caller.
    pub interrupt: &'a CancelToken,
    pub valid: AtomicUsize,
    pub rejected: AtomicUsize,
}

impl Shared<'_> {
    fn should_stop(&self) -> bool {
        self.stop.is_cancelled()
            || self.interrupt.is_cancelled()
            || self.deadline.is_some_and(|d| Instant::now() >= d)
            || self.valid.load(Ordering::SeqCst) >= self.max_examples
            || self.rejected.load(Ordering::SeqCst) > self.max_rejections
    }
}

/// Seed for one worker's example stream, derived from the run seed, the
/// property id and the worker index.
pub fn worker_seed(run_seed: u64, property: &str, worker: usize) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(run_seed.to_le_bytes());
    hasher.update(property.as_bytes());
    hasher.update((worker as u64).to_le_bytes());
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

pub(crate) fn run_worker(shared: &Shared<'_>, index: usize, run_seed: u64, tx: Sender<Found>) {
    let mut rng = StdRng::seed_from_u64(worker_seed(run_seed, shared.property.id(), index));
    while !shared.should_stop() {
        let seed = rng.next_u64();
        let mut src = DrawSource::random(seed, shared.config.bias).with_cancel(shared.stop.clone());
        if let Some(deadline) = shared.deadline {
            src = src.with_deadline(deadline);
        }
        match shared.property.check(src, &shared.config) {
            Ok(outcome) => match outcome.verdict {
                Verdict::Hold => {
                    shared.valid.fetch_add(1, Ordering::SeqCst);
                }
                Verdict::Reject(reason) => {
                    trace!(worker = index, %reason, "example rejected");
                    shared.rejected.fetch_add(1, Ordering::SeqCst);
                }
                Verdict::Violate(evidence) => {
                    shared.stop.cancel();
                    let found = Found {
                        trace: outcome.trace,
                        rendered: outcome.rendered,
                        evidence,
                        origin: Origin::Seed(seed),
                    };
                    let _ = tx.send(found);
                    return;
                }
            },
            Err(Abandoned::Overrun(limit)) => {
                trace!(worker = index, limit, "example exceeded the draw limit");
                shared.rejected.fetch_add(1, Ordering::SeqCst);
            }
            Err(Abandoned::Cancelled | Abandoned::DeadlineExceeded) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_seeds_differ() {
        let a = worker_seed(7, "p", 0);
        assert_eq!(a, worker_seed(7, "p", 0));
        assert_ne!(a, worker_seed(7, "p", 1));
        assert_ne!(a, worker_seed(7, "q", 0));
        assert_ne!(a, worker_seed(8, "p", 0));
    }
}
