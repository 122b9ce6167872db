#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

use stdprop::HarnessConfig;

pub fn stdprop() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_stdprop"));
    for var in ["STDPROP_SEED", "STDPROP_EXAMPLES", "STDPROP_TIMEOUT", "STDPROP_LOG"] {
        cmd.env_remove(var);
    }
    cmd
}

/// Run the binary inside `dir`, so that no stray `stdprop.toml` is picked up.
pub fn stdprop_in(dir: &Path, args: &[&str]) -> Output {
    stdprop().current_dir(dir).args(args).output().unwrap()
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Deterministic in-memory config for harness runs.
pub fn quick_config(examples: usize) -> HarnessConfig {
    HarnessConfig {
        max_examples: examples,
        workers: 2,
        seed: Some(20_240_917),
        database: None,
        timeout_secs: 60.0,
        ..HarnessConfig::default()
    }
}
