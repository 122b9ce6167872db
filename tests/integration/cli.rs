mod common;

use common::{stderr, stdout, stdprop_in};

#[test]
fn list_shows_every_builtin_property() {
    let dir = tempfile::tempdir().unwrap();
    let out = stdprop_in(dir.path(), &["list"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    let ids = [
        "source.tokenize_round_trip",
        "codec.base64_round_trip",
        "time.zone_offset_differential",
        "regex.match_by_construction",
    ];
    for id in ids {
        assert!(text.contains(id), "missing {id} in\n{text}");
    }
    assert!(!text.contains("time.instant"));
}

#[test]
fn list_generators_adds_tags() {
    let dir = tempfile::tempdir().unwrap();
    let out = stdprop_in(dir.path(), &["list", "--generators"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("time.instant"));
}

#[test]
fn passing_run_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let args = [
        "run", "--filter", "codec.base64", "--examples", "20", "--seed", "3", "--workers", "1",
        "--no-db",
    ];
    let out = stdprop_in(dir.path(), &args);
    assert!(out.status.success(), "{}\n{}", stdout(&out), stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("PASS"), "{text}");
    assert!(text.contains("(seed 3)"), "{text}");
    assert!(!dir.path().join(".stdprop").exists());
}

#[test]
fn json_report_parses() {
    let dir = tempfile::tempdir().unwrap();
    let args = [
        "run", "--filter", "json.", "--examples", "10", "--seed", "5", "--no-db", "--format",
        "json",
    ];
    let out = stdprop_in(dir.path(), &args);
    assert!(out.status.success(), "{}", stderr(&out));
    let report: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(report["seed"], 5);
    let properties = report["properties"].as_array().unwrap();
    assert!(!properties.is_empty());
    assert!(properties.iter().all(|p| p["state"]["state"] == "passed"), "{report}");
}

#[test]
fn unknown_filter_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = stdprop_in(dir.path(), &["run", "--filter", "no.such.property", "--no-db"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("no property matches"));
}

#[test]
fn invalid_settings_exit_two() {
    let dir = tempfile::tempdir().unwrap();
    let out = stdprop_in(dir.path(), &["run", "--examples", "0", "--no-db"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("config error"), "{}", stderr(&out));
}

#[test]
fn oversized_timeout_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let args = ["run", "--filter", "json.round", "--timeout", "1e20", "--no-db"];
    let out = stdprop_in(dir.path(), &args);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("config error"), "{}", stderr(&out));
}

#[test]
fn timeout_beyond_the_clock_runs_without_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let args =
        ["run", "--filter", "json.round", "--examples", "5", "--timeout", "1e19", "--no-db"];
    let out = stdprop_in(dir.path(), &args);
    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    assert!(stdout(&out).contains("PASS"));
}

#[test]
fn broken_config_file_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("stdprop.toml"), "max_examples = \"many\"\n").unwrap();
    let out = stdprop_in(dir.path(), &["list"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("config error"), "{}", stderr(&out));
}

#[test]
fn config_file_sets_examples() {
    let dir = tempfile::tempdir().unwrap();
    let toml = "max_examples = 7\nworkers = 1\nseed = 11\n";
    std::fs::write(dir.path().join("stdprop.toml"), toml).unwrap();
    let out = stdprop_in(dir.path(), &["run", "--filter", "checksum.crc32", "--no-db"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("(7 examples)"), "{text}");
    assert!(text.contains("(seed 11)"), "{text}");
}

#[test]
fn replay_boundary_instant_holds() {
    let dir = tempfile::tempdir().unwrap();
    let args = ["replay", "time.zone_offset_differential", "--trace", "[1, 2147483648]"];
    let out = stdprop_in(dir.path(), &args);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("input: 2147483648"), "{text}");
    assert!(text.contains("holds"), "{text}");
}

#[test]
fn replay_rejects_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let out = stdprop_in(dir.path(), &["replay", "no.such.property", "--trace", "[]"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("unknown property"));

    let out = stdprop_in(dir.path(), &["replay", "json.round_trip", "--trace", "[1, x]"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("invalid trace"));
}

#[test]
fn db_list_and_clear_on_empty_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("failures");
    let db = db.to_str().unwrap();
    let out = stdprop_in(dir.path(), &["db", "--db", db, "list"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).is_empty());

    let out = stdprop_in(dir.path(), &["db", "--db", db, "clear"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("cleared 0 properties"));

    let out = stdprop_in(dir.path(), &["db", "--db", db, "clear", "codec.base64_round_trip"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("nothing stored for codec.base64_round_trip"));
}
