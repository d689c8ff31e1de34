use std::fs;
use std::process::Command;

fn rrwg() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rrwg"))
}

#[test]
fn writes_table_and_trace() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("rrwg.conf"),
        "[default]\nvertices = 3\ntime = 5\nfunction = \"EXP\"\nseed = 1\n",
    )
    .unwrap();

    let out = rrwg().current_dir(dir.path()).output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("* Wrote rrwg.dat"), "{stderr}");
    assert!(stderr.contains("* Wrote rrwg.log"), "{stderr}");

    let table = fs::read_to_string(dir.path().join("rrwg.dat")).unwrap();
    // Header, t = 0, and five steps.
    assert_eq!(table.lines().count(), 7);
    assert!(table.starts_with("t\tw0v0\tw0v1\tw0v2\tw1v0"));

    let log = fs::read_to_string(dir.path().join("rrwg.log")).unwrap();
    assert_eq!(log.matches(" goto v").count(), 15);
}

#[test]
fn same_seed_same_table() {
    let dir = tempfile::tempdir().unwrap();
    let conf = dir.path().join("run.conf");
    fs::write(
        &conf,
        "type = \"partitions\"\nvertices = 5\ntime = 40\npartition_size = 2\nseed = 99\n",
    )
    .unwrap();

    for prefix in ["a", "b"] {
        let out = rrwg()
            .current_dir(dir.path())
            .args(["--config", "run.conf", "--no-trace", "--data", "raw", "--output", prefix])
            .output()
            .unwrap();
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    }
    let a = fs::read_to_string(dir.path().join("a.dat")).unwrap();
    let b = fs::read_to_string(dir.path().join("b.dat")).unwrap();
    assert_eq!(a, b);
    assert!(!dir.path().join("a.log").exists());
}

#[test]
fn inconsistent_config_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("rrwg.conf"),
        "type = \"partitions\"\nvertices = 3\ntime = 10\npartition_size = 5\n",
    )
    .unwrap();

    let out = rrwg().current_dir(dir.path()).output().unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("partition_size 5 exceeds"), "{stderr}");
    assert!(!dir.path().join("rrwg.dat").exists());
}

#[test]
fn missing_config_file_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let out = rrwg().current_dir(dir.path()).output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("rrwg.conf"));
}

#[test]
fn print_config_accepts_only_representable_seeds() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("rrwg.conf"),
        "vertices = 3\ntime = 5\nfunction = \"POW\"\n",
    )
    .unwrap();

    let out = rrwg()
        .current_dir(dir.path())
        .args(["--print-config", "--seed", "9223372036854775807"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let printed = String::from_utf8_lossy(&out.stdout);
    assert!(printed.contains("seed = 9223372036854775807"), "{printed}");

    let out = rrwg()
        .current_dir(dir.path())
        .args(["--print-config", "--seed", "18446744073709551615"])
        .output()
        .unwrap();
    assert!(!out.status.success());
}

#[test]
fn runs_a_layout_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("square.txt"), "1,3 *1 1\n0,2 1 1\n1,3 1 *1\n0,2 1 1\n").unwrap();
    fs::write(
        dir.path().join("rrwg.conf"),
        "type = \"file\"\ninput = \"square.txt\"\ntime = 4\nfunction = \"EXP\"\nseed = 5\nself_loops = false\n",
    )
    .unwrap();

    let out = rrwg()
        .current_dir(dir.path())
        .args(["--no-trace", "--data", "raw"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let table = fs::read_to_string(dir.path().join("rrwg.dat")).unwrap();
    assert_eq!(table.lines().count(), 6);
    assert!(table.starts_with("t\tw0v0\tw0v1\tw0v2\tw0v3\tw1v0"));
}

#[test]
fn log_level_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("rrwg.conf"),
        "vertices = 2\ntime = 3\nfunction = \"EXP\"\nseed = 3\ntrace = false\n",
    )
    .unwrap();

    let quiet = rrwg().current_dir(dir.path()).env_remove("RRWG_LOG").output().unwrap();
    assert!(quiet.status.success());
    assert!(!String::from_utf8_lossy(&quiet.stderr).contains("model built"));

    let loud = rrwg().current_dir(dir.path()).env("RRWG_LOG", "info").output().unwrap();
    assert!(loud.status.success(), "{}", String::from_utf8_lossy(&loud.stderr));
    assert!(String::from_utf8_lossy(&loud.stderr).contains("model built"));
}
