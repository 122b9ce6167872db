pub mod combinators;
pub mod draw;

use std::fmt;
use std::sync::Arc;

use crate::config::{BiasConfig, HarnessConfig};
use crate::diagnostics::Abandoned;
pub use combinators::*;
pub use draw::{Budget, CancelToken, DrawSource, Trace};

/// Produces values from a draw source under a size budget.
///
/// Implementations must be deterministic in the draws they make: the same
/// sequence of draw results yields the same value. Recursive generators must
/// consume budget on every level so that an exhausted budget forces the
/// simplest remaining path.
pub trait Generator: Send + Sync {
    type Value: Clone + fmt::Debug + Send + 'static;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<Self::Value, Abandoned>;

    fn map<U, F>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Value) -> U + Send + Sync,
        U: Clone + fmt::Debug + Send + 'static,
    {
        Map { inner: self, f }
    }

    fn boxed(self) -> BoxedGen<Self::Value>
    where
        Self: Sized + 'static,
    {
        Arc::new(self)
    }
}

pub type BoxedGen<T> = Arc<dyn Generator<Value = T>>;

impl<T: Clone + fmt::Debug + Send + 'static> Generator for Arc<dyn Generator<Value = T>> {
    type Value = T;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<T, Abandoned> {
        (**self).draw(src, budget)
    }
}

/// A generated value together with the draws that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<T> {
    pub value: T,
    pub trace: Trace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenConfig {
    pub size_budget: usize,
    pub max_draws: usize,
    pub bias: BiasConfig,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self::from(&HarnessConfig::default())
    }
}

impl From<&HarnessConfig> for GenConfig {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            size_budget: config.size_budget,
            max_draws: config.max_draws,
            bias: config.bias,
        }
    }
}

impl GenConfig {
    pub fn with_budget(mut self, size_budget: usize) -> Self {
        self.size_budget = size_budget;
        self
    }
}

/// Generate one candidate from a fresh budget. Same seed and generator give
/// the same candidate.
pub fn generate<G>(
    generator: &G,
    seed: u64,
    config: &GenConfig,
) -> Result<Candidate<G::Value>, Abandoned>
where
    G: Generator + ?Sized,
{
    let src = DrawSource::random(seed, config.bias);
    generate_from(generator, src, config)
}

/// Re-expand from a recorded trace. The returned candidate carries the draws
/// actually made, which may be shorter or smaller than `trace`.
pub fn replay<G>(
    generator: &G,
    trace: &Trace,
    config: &GenConfig,
) -> Result<Candidate<G::Value>, Abandoned>
where
    G: Generator + ?Sized,
{
    let src = DrawSource::replay(trace, config.bias);
    generate_from(generator, src, config)
}

pub fn generate_from<G>(
    generator: &G,
    src: DrawSource,
    config: &GenConfig,
) -> Result<Candidate<G::Value>, Abandoned>
where
    G: Generator + ?Sized,
{
    let mut src = src.with_max_draws(config.max_draws);
    let mut budget = Budget::new(config.size_budget);
    let value = generator.draw(&mut src, &mut budget)?;
    Ok(Candidate { value, trace: src.into_trace() })
}
