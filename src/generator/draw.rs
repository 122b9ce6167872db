//! Draw sources, traces and size budgets.
//!
//! Every random decision made during generation goes through a `DrawSource`
//! and is recorded as a `u64` in the candidate's `Trace`. Replaying a trace
//! reproduces the same decisions, which is what shrinking manipulates.

use std::cmp::Ordering;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::BiasConfig;
use crate::diagnostics::Abandoned;

/// Recorded draws of one candidate.
///
/// Ordered shortlex: fewer draws first, then lexicographically smaller draw
/// values. This order is well-founded, so any strictly-decreasing sequence of
/// traces is finite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trace(Vec<u64>);

impl Trace {
    pub fn new(draws: Vec<u64>) -> Self {
        Self(draws)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn draws(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u64> {
        self.0
    }
}

impl From<Vec<u64>> for Trace {
    fn from(draws: Vec<u64>) -> Self {
        Self(draws)
    }
}

/// Parses the `Display` form (`[1, 2]`) or a bare list (`1,2`).
impl FromStr for Trace {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim().trim_start_matches('[').trim_end_matches(']');
        inner
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<u64>, _>>()
            .map(Self)
    }
}

impl Ord for Trace {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.len().cmp(&other.0.len()).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Trace {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Shared cancellation flag, checked on every draw.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }
}

/// Remaining size budget for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    remaining: usize,
}

impl Budget {
    pub fn new(size: usize) -> Self {
        Self { remaining: size }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub fn can_afford(&self, cost: usize) -> bool {
        cost <= self.remaining
    }

    pub fn consume(&mut self, amount: usize) {
        self.remaining = self.remaining.saturating_sub(amount);
    }
}

enum Mode {
    Random(StdRng),
    Replay { prefix: Vec<u64>, pos: usize },
}

pub struct DrawSource {
    mode: Mode,
    recorded: Vec<u64>,
    bias: BiasConfig,
    cancel: Option<CancelToken>,
    deadline: Option<Instant>,
    max_draws: usize,
}

impl DrawSource {
    pub fn random(seed: u64, bias: BiasConfig) -> Self {
        Self::with_mode(Mode::Random(StdRng::seed_from_u64(seed)), bias)
    }

    /// Draws beyond the end of `trace` read as 0; out-of-range draws are
    /// clamped to the requested bound.
    pub fn replay(trace: &Trace, bias: BiasConfig) -> Self {
        Self::with_mode(Mode::Replay { prefix: trace.draws().to_vec(), pos: 0 }, bias)
    }

    fn with_mode(mode: Mode, bias: BiasConfig) -> Self {
        Self {
            mode,
            recorded: Vec::new(),
            bias,
            cancel: None,
            deadline: None,
            max_draws: usize::MAX,
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_max_draws(mut self, max_draws: usize) -> Self {
        self.max_draws = max_draws;
        self
    }

    pub fn is_replay(&self) -> bool {
        matches!(self.mode, Mode::Replay { .. })
    }

    pub fn draws_made(&self) -> usize {
        self.recorded.len()
    }

    pub fn into_trace(self) -> Trace {
        Trace(self.recorded)
    }

    fn checkpoint(&self) -> Result<(), Abandoned> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(Abandoned::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Abandoned::DeadlineExceeded);
        }
        if self.recorded.len() >= self.max_draws {
            return Err(Abandoned::Overrun(self.max_draws));
        }
        Ok(())
    }

    /// Draw an offset in `0..=span`. Random mode favours the ends of the
    /// range according to the bias weights; 0 is the simplest value.
    pub fn draw_offset(&mut self, span: u64) -> Result<u64, Abandoned> {
        self.checkpoint()?;
        let bias = self.bias;
        let value = match &mut self.mode {
            Mode::Random(rng) => biased_offset(rng, span, bias),
            Mode::Replay { prefix, pos } => {
                let v = prefix.get(*pos).copied().unwrap_or(0);
                *pos += 1;
                v.min(span)
            }
        };
        self.recorded.push(value);
        Ok(value)
    }

    /// Draw an index into `weights` proportionally to the weights. The
    /// recorded value is the index itself.
    pub fn draw_weighted(&mut self, weights: &[u32]) -> Result<usize, Abandoned> {
        self.checkpoint()?;
        let last = weights.len().saturating_sub(1) as u64;
        let index = match &mut self.mode {
            Mode::Random(rng) => {
                let total: u64 = weights.iter().map(|&w| u64::from(w)).sum();
                if total == 0 {
                    0
                } else {
                    let mut pick = rng.random_range(0..total);
                    let mut chosen = last;
                    for (i, &w) in weights.iter().enumerate() {
                        if pick < u64::from(w) {
                            chosen = i as u64;
                            break;
                        }
                        pick -= u64::from(w);
                    }
                    chosen
                }
            }
            Mode::Replay { prefix, pos } => {
                let v = prefix.get(*pos).copied().unwrap_or(0);
                *pos += 1;
                v.min(last)
            }
        };
        self.recorded.push(index);
        Ok(index as usize)
    }

    /// Draw from `lo..=hi`; shrinks toward `lo`.
    pub fn draw_int(&mut self, lo: i64, hi: i64) -> Result<i64, Abandoned> {
        debug_assert!(lo <= hi);
        let span = hi.abs_diff(lo);
        let offset = self.draw_offset(span)?;
        Ok(lo.wrapping_add(offset as i64))
    }

    pub fn draw_bool(&mut self) -> Result<bool, Abandoned> {
        Ok(self.draw_offset(1)? == 1)
    }
}

fn biased_offset(rng: &mut StdRng, span: u64, bias: BiasConfig) -> u64 {
    let total = u64::from(bias.boundary_weight) + u64::from(bias.uniform_weight);
    let boundary = total > 0 && rng.random_range(0..total) < u64::from(bias.boundary_weight);
    if boundary {
        let edges = [0, span, 1.min(span), span.saturating_sub(1)];
        edges[rng.random_range(0..edges.len())]
    } else {
        rng.random_range(0..=span)
    }
}
