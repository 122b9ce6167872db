use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::harness::{FailureRecord, PropertyState};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyReport {
    pub id: String,
    pub description: String,
    pub shape: &'static str,
    pub state: PropertyState,
    /// Valid examples evaluated during exploration.
    pub examples: usize,
    pub rejected: usize,
    /// Stored failures replayed before exploration.
    pub replayed: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub properties: Vec<PropertyReport>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub exhausted: usize,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.properties.iter().any(|p| matches!(p.state, PropertyState::Failed { .. }))
    }

    pub fn summary(&self) -> Summary {
        let mut s = Summary::default();
        for p in &self.properties {
            match p.state {
                PropertyState::Passed { .. } => s.passed += 1,
                PropertyState::Failed { .. } => s.failed += 1,
                PropertyState::Exhausted { .. } => s.exhausted += 1,
                PropertyState::Pending | PropertyState::Running { .. } => {}
            }
        }
        s
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for p in &self.properties {
            render_property(&mut out, p);
        }
        let s = self.summary();
        let _ = writeln!(
            out,
            "\n{} properties: {} passed, {} failed, {} exhausted (seed {})",
            self.properties.len(),
            s.passed,
            s.failed,
            s.exhausted,
            self.seed
        );
        out
    }

    pub fn render_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn render_property(out: &mut String, p: &PropertyReport) {
    match &p.state {
        PropertyState::Passed { examples } => {
            let _ = writeln!(out, "{:<10} {} ({examples} examples)", "PASS", p.id);
        }
        PropertyState::Exhausted { examples, reason } => {
            let _ = writeln!(out, "{:<10} {} ({examples} examples, {reason})", "EXHAUSTED", p.id);
        }
        PropertyState::Failed { failures } => {
            for failure in failures {
                render_failure(out, failure);
            }
        }
        other => {
            let _ = writeln!(out, "{:<10} {}", other.name().to_uppercase(), p.id);
        }
    }
}

fn render_failure(out: &mut String, f: &FailureRecord) {
    let _ = writeln!(out, "{:<10} {} ({})", "FAIL", f.property, f.kind());
    let _ = writeln!(out, "    minimized: {}", f.minimized.input);
    let _ = writeln!(out, "    trace: {}", f.minimized.trace);
    if f.original.input != f.minimized.input {
        let _ = writeln!(out, "    original: {}", f.original.input);
    }
    for line in f.evidence.to_string().lines() {
        let _ = writeln!(out, "    {line}");
    }
    let _ = writeln!(
        out,
        "    replay: stdprop replay {} --trace \"{}\"",
        f.property, f.minimized.trace
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Trace;
    use crate::harness::{Counterexample, ExhaustReason, Origin};
    use crate::oracle::Evidence;

    fn report() -> RunReport {
        let failure = FailureRecord {
            property: "time.zone_offset_differential".into(),
            original: Counterexample {
                trace: Trace::new(vec![1, 3000000000]),
                input: "3000000000".into(),
            },
            minimized: Counterexample {
                trace: Trace::new(vec![1, 2147483648]),
                input: "2147483648".into(),
            },
            evidence: Evidence::Differential {
                input: "2147483648".into(),
                left_name: "wide".into(),
                left: "7200".into(),
                right_name: "narrow".into(),
                right: "0".into(),
            },
            shrink_attempts: 40,
            origin: Origin::Seed(9),
        };
        let property = |id: &str, state| PropertyReport {
            id: id.into(),
            description: String::new(),
            shape: "differential",
            state,
            examples: 0,
            rejected: 0,
            replayed: 0,
            elapsed_ms: 0,
        };
        RunReport {
            run_id: Uuid::nil(),
            seed: 42,
            started_at: DateTime::<Utc>::UNIX_EPOCH,
            properties: vec![
                property("codec.base64_round_trip", PropertyState::Passed { examples: 100 }),
                property(
                    "time.iso_week_round_trip",
                    PropertyState::Exhausted { examples: 37, reason: ExhaustReason::Deadline },
                ),
                property(
                    "time.zone_offset_differential",
                    PropertyState::Failed { failures: vec![failure] },
                ),
            ],
        }
    }

    #[test]
    fn text_report() {
        let r = report();
        assert!(r.has_failures());
        insta::assert_snapshot!(r.render_text(), @r#"
        PASS       codec.base64_round_trip (100 examples)
        EXHAUSTED  time.iso_week_round_trip (37 examples, deadline reached)
        FAIL       time.zone_offset_differential (differential disagreement)
            minimized: 2147483648
            trace: [1, 2147483648]
            original: 3000000000
            implementations disagree
              input: 2147483648
              wide: 7200
              narrow: 0
            replay: stdprop replay time.zone_offset_differential --trace "[1, 2147483648]"

        3 properties: 1 passed, 1 failed, 1 exhausted (seed 42)
        "#);
    }

    #[test]
    fn json_report() {
        let text = report().render_json().unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["seed"], 42);
        let failed = &json["properties"][2]["state"];
        assert_eq!(failed["state"], "failed");
        let failure = &failed["failures"][0];
        assert_eq!(failure["minimized"]["trace"], serde_json::json!([1, 2147483648u64]));
        assert_eq!(failure["evidence"]["shape"], "differential");
        assert_eq!(failure["origin"]["seed"], 9);
        assert_eq!(json["properties"][1]["state"]["reason"], "deadline");
    }

    #[test]
    fn summary_counts() {
        assert_eq!(report().summary(), Summary { passed: 1, failed: 1, exhausted: 1 });
    }
}
