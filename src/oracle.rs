//! Property oracles.
//!
//! An oracle is one of three fixed shapes. Each shape composes the functions
//! under test at construction time and evaluates them with a dedicated
//! routine that turns their results into a `Verdict`. Functions under test
//! report declared domain limits with `TargetError::OutOfDomain`; any other
//! error, and any panic, is a crash.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::render_divergence;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum TargetError {
    /// The input lies outside the function's declared domain.
    #[error("out of domain: {0}")]
    OutOfDomain(String),
    #[error("failed: {0}")]
    Failed(String),
    #[error("panicked: {0}")]
    Panicked(String),
}

impl TargetError {
    pub fn out_of_domain(msg: impl fmt::Display) -> Self {
        Self::OutOfDomain(msg.to_string())
    }

    pub fn failed(msg: impl fmt::Display) -> Self {
        Self::Failed(msg.to_string())
    }

    pub fn is_out_of_domain(&self) -> bool {
        matches!(self, Self::OutOfDomain(_))
    }
}

pub type TargetResult<T> = Result<T, TargetError>;

/// Run a function under test, converting a panic into `TargetError::Panicked`.
pub fn guarded<T>(f: impl FnOnce() -> TargetResult<T>) -> TargetResult<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(TargetError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Which function under test crashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Encode,
    Decode,
    Transform,
    Source,
    FollowUp,
    Left,
    Right,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Encode => "encode",
            Stage::Decode => "decode",
            Stage::Transform => "transform",
            Stage::Source => "function on input",
            Stage::FollowUp => "function on transformed input",
            Stage::Left => "left implementation",
            Stage::Right => "right implementation",
        };
        f.write_str(name)
    }
}

/// Shrinking only accepts candidates that fail with the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    RoundTripMismatch,
    RelationViolated,
    Disagreement,
    Crash(Stage),
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::RoundTripMismatch => write!(f, "round-trip mismatch"),
            ViolationKind::RelationViolated => write!(f, "metamorphic relation violated"),
            ViolationKind::Disagreement => write!(f, "differential disagreement"),
            ViolationKind::Crash(stage) => write!(f, "crash in {stage}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Evidence {
    RoundTrip {
        input: String,
        encoded: String,
        decoded: String,
        divergence: Option<String>,
    },
    Metamorphic {
        relation: String,
        input: String,
        transformed: String,
        output: String,
        transformed_output: String,
    },
    Differential {
        input: String,
        left_name: String,
        left: String,
        right_name: String,
        right: String,
    },
    Crash {
        stage: Stage,
        input: String,
        error: TargetError,
    },
}

impl Evidence {
    pub fn kind(&self) -> ViolationKind {
        match self {
            Evidence::RoundTrip { .. } => ViolationKind::RoundTripMismatch,
            Evidence::Metamorphic { .. } => ViolationKind::RelationViolated,
            Evidence::Differential { .. } => ViolationKind::Disagreement,
            Evidence::Crash { stage, .. } => ViolationKind::Crash(*stage),
        }
    }

    /// The rendered input that produced this evidence.
    pub fn input(&self) -> &str {
        match self {
            Evidence::RoundTrip { input, .. }
            | Evidence::Metamorphic { input, .. }
            | Evidence::Differential { input, .. }
            | Evidence::Crash { input, .. } => input,
        }
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evidence::RoundTrip { input, encoded, decoded, divergence } => {
                writeln!(f, "round trip mismatch")?;
                writeln!(f, "  input:   {input}")?;
                writeln!(f, "  encoded: {encoded}")?;
                write!(f, "  decoded: {decoded}")?;
                if let Some(d) = divergence {
                    write!(f, "\n{}", d.trim_end())?;
                }
                Ok(())
            }
            Evidence::Metamorphic { relation, input, transformed, output, transformed_output } => {
                writeln!(f, "relation `{relation}` violated")?;
                writeln!(f, "  input:          {input}")?;
                writeln!(f, "  transformed:    {transformed}")?;
                writeln!(f, "  f(input):       {output}")?;
                write!(f, "  f(transformed): {transformed_output}")
            }
            Evidence::Differential { input, left_name, left, right_name, right } => {
                writeln!(f, "implementations disagree")?;
                writeln!(f, "  input: {input}")?;
                writeln!(f, "  {left_name}: {left}")?;
                write!(f, "  {right_name}: {right}")
            }
            Evidence::Crash { stage, input, error } => {
                writeln!(f, "crash in {stage}")?;
                writeln!(f, "  input: {input}")?;
                write!(f, "  error: {error}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Hold,
    /// Declared out of domain; not counted as an example.
    Reject(String),
    Violate(Evidence),
}

impl Verdict {
    pub fn is_violation(&self) -> bool {
        matches!(self, Verdict::Violate(_))
    }
}

fn render<T: fmt::Debug>(value: &T) -> String {
    format!("{value:?}")
}

fn crash<V: fmt::Debug>(stage: Stage, input: &V, error: TargetError) -> Verdict {
    Verdict::Violate(Evidence::Crash { stage, input: render(input), error })
}

enum CycleRun<V> {
    EncodeFailed(TargetError),
    DecodeFailed(TargetError),
    Completed { encoded: String, decoded: V },
}

pub struct RoundTrip<V> {
    cycle: Box<dyn Fn(&V) -> CycleRun<V> + Send + Sync>,
    same: Box<dyn Fn(&V, &V) -> bool + Send + Sync>,
}

enum ObserveRun {
    SourceFailed(TargetError),
    FollowUpFailed(TargetError),
    Compared { output: String, transformed_output: String, holds: bool },
}

pub struct Metamorphic<V> {
    relation: String,
    transform: Box<dyn Fn(&V) -> TargetResult<V> + Send + Sync>,
    observe: Box<dyn Fn(&V, &V) -> ObserveRun + Send + Sync>,
}

struct DiffRun {
    left: TargetResult<String>,
    right: TargetResult<String>,
    agree: bool,
}

pub struct Differential<V> {
    left_name: String,
    right_name: String,
    run: Box<dyn Fn(&V) -> DiffRun + Send + Sync>,
}

pub enum Oracle<V> {
    RoundTrip(RoundTrip<V>),
    Metamorphic(Metamorphic<V>),
    Differential(Differential<V>),
}

impl<V: fmt::Debug + 'static> Oracle<V> {
    /// `decode(encode(x)) == x`.
    pub fn round_trip<E, Enc, Dec>(encode: Enc, decode: Dec) -> Self
    where
        V: PartialEq,
        E: fmt::Debug + 'static,
        Enc: Fn(&V) -> TargetResult<E> + Send + Sync + 'static,
        Dec: Fn(&E) -> TargetResult<V> + Send + Sync + 'static,
    {
        Self::round_trip_by(encode, decode, |a: &V, b: &V| a == b)
    }

    /// Round trip under a caller-supplied equivalence.
    pub fn round_trip_by<E, Enc, Dec, Same>(encode: Enc, decode: Dec, same: Same) -> Self
    where
        E: fmt::Debug + 'static,
        Enc: Fn(&V) -> TargetResult<E> + Send + Sync + 'static,
        Dec: Fn(&E) -> TargetResult<V> + Send + Sync + 'static,
        Same: Fn(&V, &V) -> bool + Send + Sync + 'static,
    {
        let cycle = move |x: &V| -> CycleRun<V> {
            let encoded = match guarded(|| encode(x)) {
                Ok(e) => e,
                Err(err) => return CycleRun::EncodeFailed(err),
            };
            match guarded(|| decode(&encoded)) {
                Ok(decoded) => CycleRun::Completed { encoded: render(&encoded), decoded },
                Err(err) => CycleRun::DecodeFailed(err),
            }
        };
        Oracle::RoundTrip(RoundTrip { cycle: Box::new(cycle), same: Box::new(same) })
    }

    /// `holds(f(x), f(transform(x)))`.
    pub fn metamorphic<R, T, F, Rel>(
        relation: impl Into<String>,
        transform: T,
        f: F,
        holds: Rel,
    ) -> Self
    where
        R: fmt::Debug + 'static,
        T: Fn(&V) -> TargetResult<V> + Send + Sync + 'static,
        F: Fn(&V) -> TargetResult<R> + Send + Sync + 'static,
        Rel: Fn(&R, &R) -> bool + Send + Sync + 'static,
    {
        let transform = move |x: &V| guarded(|| transform(x));
        let observe = move |x: &V, tx: &V| -> ObserveRun {
            let output = match guarded(|| f(x)) {
                Ok(o) => o,
                Err(err) => return ObserveRun::SourceFailed(err),
            };
            let transformed_output = match guarded(|| f(tx)) {
                Ok(o) => o,
                Err(err) => return ObserveRun::FollowUpFailed(err),
            };
            ObserveRun::Compared {
                holds: holds(&output, &transformed_output),
                output: render(&output),
                transformed_output: render(&transformed_output),
            }
        };
        Oracle::Metamorphic(Metamorphic {
            relation: relation.into(),
            transform: Box::new(transform),
            observe: Box::new(observe),
        })
    }

    /// `left(x) == right(x)`; both sides declaring the input out of domain
    /// is a rejection.
    pub fn differential<R, L, Rt>(
        left_name: impl Into<String>,
        left: L,
        right_name: impl Into<String>,
        right: Rt,
    ) -> Self
    where
        R: PartialEq + fmt::Debug + 'static,
        L: Fn(&V) -> TargetResult<R> + Send + Sync + 'static,
        Rt: Fn(&V) -> TargetResult<R> + Send + Sync + 'static,
    {
        let run = move |x: &V| -> DiffRun {
            let l = guarded(|| left(x));
            let r = guarded(|| right(x));
            let agree = matches!((&l, &r), (Ok(a), Ok(b)) if a == b);
            DiffRun { left: l.map(|v| render(&v)), right: r.map(|v| render(&v)), agree }
        };
        Oracle::Differential(Differential {
            left_name: left_name.into(),
            right_name: right_name.into(),
            run: Box::new(run),
        })
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Oracle::RoundTrip(_) => "round-trip",
            Oracle::Metamorphic(_) => "metamorphic",
            Oracle::Differential(_) => "differential",
        }
    }

    pub fn evaluate(&self, input: &V) -> Verdict {
        match self {
            Oracle::RoundTrip(rt) => rt.evaluate(input),
            Oracle::Metamorphic(m) => m.evaluate(input),
            Oracle::Differential(d) => d.evaluate(input),
        }
    }
}

impl<V: fmt::Debug> RoundTrip<V> {
    fn evaluate(&self, input: &V) -> Verdict {
        match (self.cycle)(input) {
            CycleRun::EncodeFailed(TargetError::OutOfDomain(reason)) => Verdict::Reject(reason),
            CycleRun::EncodeFailed(err) => crash(Stage::Encode, input, err),
            CycleRun::DecodeFailed(err) => crash(Stage::Decode, input, err),
            CycleRun::Completed { encoded, decoded } => {
                if (self.same)(input, &decoded) {
                    return Verdict::Hold;
                }
                let input = render(input);
                let decoded = render(&decoded);
                let divergence = render_divergence(&input, &decoded);
                Verdict::Violate(Evidence::RoundTrip { input, encoded, decoded, divergence })
            }
        }
    }
}

impl<V: fmt::Debug> Metamorphic<V> {
    fn evaluate(&self, input: &V) -> Verdict {
        let transformed = match (self.transform)(input) {
            Ok(t) => t,
            Err(TargetError::OutOfDomain(reason)) => return Verdict::Reject(reason),
            Err(err) => return crash(Stage::Transform, input, err),
        };
        match (self.observe)(input, &transformed) {
            ObserveRun::SourceFailed(TargetError::OutOfDomain(reason)) => Verdict::Reject(reason),
            ObserveRun::SourceFailed(err) => crash(Stage::Source, input, err),
            ObserveRun::FollowUpFailed(err) => crash(Stage::FollowUp, input, err),
            ObserveRun::Compared { holds: true, .. } => Verdict::Hold,
            ObserveRun::Compared { output, transformed_output, .. } => {
                Verdict::Violate(Evidence::Metamorphic {
                    relation: self.relation.clone(),
                    input: render(input),
                    transformed: render(&transformed),
                    output,
                    transformed_output,
                })
            }
        }
    }
}

impl<V: fmt::Debug> Differential<V> {
    fn evaluate(&self, input: &V) -> Verdict {
        let DiffRun { left, right, agree } = (self.run)(input);
        if agree {
            return Verdict::Hold;
        }
        match (left, right) {
            (Err(TargetError::OutOfDomain(reason)), Err(TargetError::OutOfDomain(_))) => {
                Verdict::Reject(reason)
            }
            (Err(err), _) if !err.is_out_of_domain() => crash(Stage::Left, input, err),
            (_, Err(err)) if !err.is_out_of_domain() => crash(Stage::Right, input, err),
            (left, right) => Verdict::Violate(Evidence::Differential {
                input: render(input),
                left_name: self.left_name.clone(),
                left: describe(left),
                right_name: self.right_name.clone(),
                right: describe(right),
            }),
        }
    }
}

fn describe(result: TargetResult<String>) -> String {
    match result {
        Ok(rendered) => rendered,
        Err(err) => err.to_string(),
    }
}
