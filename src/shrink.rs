//! Trace-level shrinking.
//!
//! The shrinker never looks at values. It proposes edited draw traces and
//! asks a probe whether the replayed candidate still fails the same way. The
//! probe answers with the trace the replay actually consumed (draws past the
//! end read as zero, out-of-range draws are clamped), and the shrinker keeps
//! that normalized trace only when it is strictly smaller in shortlex order
//! than the best one so far. Every accepted step therefore shrinks a
//! well-founded order, and `max_attempts` bounds the total work.

use tracing::debug;

use crate::generator::Trace;

/// Chunk sizes tried by the deletion pass, largest first.
const CHUNK_SIZES: [usize; 4] = [8, 4, 2, 1];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShrinkOutcome {
    pub trace: Trace,
    /// Probe calls made.
    pub attempts: usize,
    /// Probe calls that produced a smaller failing trace.
    pub improvements: usize,
}

struct Shrinker<P> {
    best: Vec<u64>,
    probe: P,
    attempts: usize,
    improvements: usize,
    max_attempts: usize,
}

/// Minimize `initial`, which must already fail. `probe` replays a proposed
/// trace and returns the normalized trace when the replay still fails with
/// the same violation kind.
pub fn shrink<P>(initial: Trace, max_attempts: usize, probe: P) -> ShrinkOutcome
where
    P: FnMut(&Trace) -> Option<Trace>,
{
    let mut s =
        Shrinker { best: initial.into_inner(), probe, attempts: 0, improvements: 0, max_attempts };
    s.run();
    debug!(
        attempts = s.attempts,
        improvements = s.improvements,
        len = s.best.len(),
        "shrink finished"
    );
    ShrinkOutcome { trace: Trace::new(s.best), attempts: s.attempts, improvements: s.improvements }
}

impl<P> Shrinker<P>
where
    P: FnMut(&Trace) -> Option<Trace>,
{
    fn run(&mut self) {
        if self.best.is_empty() {
            return;
        }
        if self.try_candidate(Vec::new()) && self.best.iter().all(|&d| d == 0) {
            return;
        }
        loop {
            let before = self.improvements;
            self.delete_chunks();
            self.zero_draws();
            self.minimize_draws();
            if self.improvements == before || self.out_of_attempts() {
                return;
            }
        }
    }

    fn out_of_attempts(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Probe `candidate`; adopt the normalized result when it is smaller.
    fn try_candidate(&mut self, candidate: Vec<u64>) -> bool {
        if self.out_of_attempts() {
            return false;
        }
        let candidate = Trace::new(candidate);
        let current = Trace::new(self.best.clone());
        if candidate >= current {
            return false;
        }
        self.attempts += 1;
        match (self.probe)(&candidate) {
            Some(normalized) if normalized < current => {
                self.best = normalized.into_inner();
                self.improvements += 1;
                true
            }
            _ => false,
        }
    }

    fn delete_chunks(&mut self) {
        for size in CHUNK_SIZES {
            let mut end = self.best.len();
            while end >= size && !self.out_of_attempts() {
                let start = end - size;
                let mut candidate = self.best.clone();
                candidate.drain(start..end);
                if self.try_candidate(candidate) {
                    end = end.min(self.best.len());
                } else {
                    end -= 1;
                }
            }
        }
    }

    fn zero_draws(&mut self) {
        let mut i = 0;
        while i < self.best.len() && !self.out_of_attempts() {
            if self.best[i] != 0 {
                let mut candidate = self.best.clone();
                candidate[i] = 0;
                self.try_candidate(candidate);
            }
            i += 1;
        }
    }

    /// Binary-search each draw toward the smallest value that still fails.
    fn minimize_draws(&mut self) {
        let mut i = 0;
        while i < self.best.len() && !self.out_of_attempts() {
            let mut lo = 0u64;
            let mut hi = self.best[i];
            while lo + 1 < hi && !self.out_of_attempts() {
                let mid = lo + (hi - lo) / 2;
                let mut candidate = self.best.clone();
                candidate[i] = mid;
                if self.try_candidate(candidate) {
                    match self.best.get(i) {
                        Some(&v) => hi = v.min(mid),
                        None => break,
                    }
                } else {
                    lo = mid;
                }
            }
            i += 1;
        }
    }
}
