use std::fmt;

use crate::diagnostics::Abandoned;
use crate::generator::{DrawSource, GenConfig, Generator, Trace, generate_from};
use crate::oracle::{Oracle, Verdict};

/// A generator paired with the oracle that judges its values.
pub struct Property<G: Generator> {
    id: String,
    description: String,
    generator: G,
    oracle: Oracle<G::Value>,
}

impl<G: Generator> Property<G> {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        generator: G,
        oracle: Oracle<G::Value>,
    ) -> Self {
        Self { id: id.into(), description: description.into(), generator, oracle }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn evaluate(&self, value: &G::Value) -> Verdict {
        self.oracle.evaluate(value)
    }
}

/// One evaluated example.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    /// Draws actually made while generating the value.
    pub trace: Trace,
    /// `Debug` rendering of the generated value.
    pub rendered: String,
    pub verdict: Verdict,
}

/// Type-erased view of a property, so that properties over different value
/// types can share one registry and one harness.
pub trait Checkable: Send + Sync {
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    fn shape(&self) -> &'static str;

    fn check(&self, src: DrawSource, config: &GenConfig) -> Result<CaseOutcome, Abandoned>;

    fn check_trace(&self, trace: &Trace, config: &GenConfig) -> Result<CaseOutcome, Abandoned> {
        self.check(DrawSource::replay(trace, config.bias), config)
    }
}

impl<G: Generator> Checkable for Property<G> {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn shape(&self) -> &'static str {
        self.oracle.shape()
    }

    fn check(&self, src: DrawSource, config: &GenConfig) -> Result<CaseOutcome, Abandoned> {
        let candidate = generate_from(&self.generator, src, config)?;
        let verdict = self.oracle.evaluate(&candidate.value);
        let rendered = format!("{:?}", candidate.value);
        Ok(CaseOutcome { trace: candidate.trace, rendered, verdict })
    }
}

impl fmt::Debug for dyn Checkable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property").field("id", &self.id()).field("shape", &self.shape()).finish()
    }
}
