mod common;

use common::{binary_stl, ServerGuard, TestEnv};
use predicates::str::contains;

#[test]
fn intake_routes_clean_infected_and_unsupported_files() {
    let env = TestEnv::new();
    env.drop_in("cube.stl", &binary_stl(100));
    env.drop_in("eicar.stl", &binary_stl(1));
    env.drop_in("notes.txt", b"hello world\n");

    let out = env.run_json(&["intake", "run"]);
    assert_eq!(out["ok"], true);
    let reports = out["data"].as_array().expect("report array");
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0]["file"], "cube.stl");
    assert_eq!(reports[0]["action"], "accepted");
    assert_eq!(reports[0]["format"], "binary_stl");
    assert_eq!(reports[0]["count"], 100);
    assert_eq!(reports[1]["action"], "quarantined");
    assert_eq!(reports[2]["action"], "unsupported");

    assert_eq!(std::fs::metadata(env.sync.join("cube.stl")).unwrap().len(), 5084);
    assert!(env.quarantine.join("eicar.stl").is_file());
    assert!(!env.sync.join("eicar.stl").exists());
    assert!(env.inbox.join("notes.txt").is_file());
    assert!(!env.inbox.join("cube.stl").exists());

    let audit = std::fs::read_to_string(env.root.join("logs/audit.jsonl")).unwrap();
    assert_eq!(audit.lines().count(), 3);
}

#[test]
fn infected_file_is_never_listed() {
    let env = TestEnv::new();
    env.drop_in("eicar.obj", b"v 0 0 0\nf 1 1 1\n");
    env.run_json(&["intake", "run"]);

    let listed = env.run_json(&["listing", "list"]);
    assert_eq!(listed["data"].as_array().unwrap().len(), 0);
}

#[test]
fn local_acknowledge_is_idempotent() {
    let env = TestEnv::new();
    env.drop_in("part.obj", b"# part\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
    env.run_json(&["intake", "run"]);

    let listed = env.run_json(&["listing", "list"]);
    assert_eq!(listed["data"][0]["name"], "part.obj");

    let first = env.run_json(&["listing", "ack", "part.obj"]);
    assert_eq!(first["data"]["archived"][0], "part.obj");
    let second = env.run_json(&["listing", "ack", "part.obj"]);
    assert_eq!(second["data"]["missing"][0], "part.obj");
    assert!(env.sync.join("DONE/part.obj").is_file());

    let listed = env.run_json(&["listing", "list"]);
    assert_eq!(listed["data"].as_array().unwrap().len(), 0);
}

#[test]
fn acknowledging_only_bad_names_fails_the_batch() {
    let env = TestEnv::new();
    env.cmd()
        .args(["--json", "listing", "ack", "../escape.stl", "DONE"])
        .assert()
        .failure()
        .stdout(contains("PARTIAL_BATCH"));
}

#[test]
fn truncated_binary_stl_is_an_incomplete_header() {
    let env = TestEnv::new();
    let path = env.root.join("truncated.stl");
    std::fs::write(&path, &binary_stl(0)[..83]).unwrap();

    let out = env.run_json(&["intake", "check", path.to_str().unwrap()]);
    assert_eq!(out["data"][0]["result"], "invalid");
    assert!(out["data"][0]["reason"]
        .as_str()
        .unwrap()
        .contains("incomplete header"));
}

#[test]
fn check_works_without_a_config_file() {
    let env = TestEnv::new();
    let path = env.root.join("empty.stl");
    std::fs::write(&path, binary_stl(0)).unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("modelgate");
    cmd.args(["--config"])
        .arg(env.root.join("absent.toml"))
        .args(["intake", "check"])
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("valid\tbinary STL\t0"));
}

#[test]
fn missing_config_is_a_config_error() {
    let env = TestEnv::new();
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("modelgate");
    cmd.args(["--json", "--config"])
        .arg(env.root.join("absent.toml"))
        .args(["sync", "list"])
        .assert()
        .failure()
        .stdout(contains("\"code\": \"CONFIG\""));
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let env = TestEnv::new();
    env.cmd()
        .args(["--json", "sync", "list"])
        .assert()
        .failure()
        .stdout(contains("\"code\": \"TRANSPORT\""));
}

#[test]
fn clean_stl_travels_from_inbox_to_client_and_archive() {
    let env = TestEnv::new();
    env.drop_in("cube.stl", &binary_stl(100));
    env.run_json(&["intake", "run"]);

    let _server = ServerGuard::start(&env);

    let listing = env.run_json(&["sync", "list"]);
    assert_eq!(listing["data"]["scanned_files"][0], "cube.stl");
    assert_eq!(listing["data"]["files"][0]["size"], 5084);

    let pulled = env.run_json(&["sync", "pull", "--ack"]);
    assert_eq!(pulled["data"]["pulled"][0]["status"], "downloaded");
    assert_eq!(pulled["data"]["acknowledged"]["acknowledged"][0], "cube.stl");
    assert_eq!(
        std::fs::metadata(env.download.join("cube.stl")).unwrap().len(),
        5084
    );

    let listing = env.run_json(&["sync", "list"]);
    assert_eq!(listing["data"]["scanned_files"].as_array().unwrap().len(), 0);
    assert!(env.sync.join("DONE/cube.stl").is_file());

    // A retried acknowledgment after a crash is still a success.
    let again = env.run_json(&["sync", "ack", "cube.stl"]);
    assert_eq!(again["data"]["acknowledged"][0], "cube.stl");
}

#[test]
fn pull_skips_files_already_downloaded() {
    let env = TestEnv::new();
    env.drop_in("cube.stl", &binary_stl(2));
    env.run_json(&["intake", "run"]);
    let _server = ServerGuard::start(&env);

    let first = env.run_json(&["sync", "pull", "cube.stl"]);
    assert_eq!(first["data"]["pulled"][0]["status"], "downloaded");
    let second = env.run_json(&["sync", "pull", "cube.stl", "ghost.stl"]);
    assert_eq!(second["data"]["pulled"][0]["status"], "already_local");
    assert_eq!(second["data"]["pulled"][1]["status"], "not_listed");
    // Without --ack the server still lists the file.
    let listing = env.run_json(&["sync", "list"]);
    assert_eq!(listing["data"]["scanned_files"][0], "cube.stl");
}
