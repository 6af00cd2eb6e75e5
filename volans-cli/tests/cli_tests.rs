use assert_cmd::Command;
use predicates::prelude::*;
use std::os::unix::fs::symlink;
use std::path::Path;

/// A complete `/proc/<pid>/status` as a 6.x kernel writes it
fn status_file(pid: i32, cpus_allowed: &str) -> String {
    format!(
        "Name:\tproc{pid}\nUmask:\t0022\nState:\tS (sleeping)\nTgid:\t{pid}\nNgid:\t0\n\
         Pid:\t{pid}\nPPid:\t1\nTracerPid:\t0\nUid:\t0\t0\t0\t0\nGid:\t0\t0\t0\t0\n\
         FDSize:\t64\nGroups:\t \nNStgid:\t{pid}\nNSpid:\t{pid}\nNSpgid:\t{pid}\nNSsid:\t1\n\
         VmPeak:\t    2640 kB\nVmSize:\t    2640 kB\nVmLck:\t       0 kB\nVmPin:\t       0 kB\n\
         VmHWM:\t    1400 kB\nVmRSS:\t    1400 kB\nRssAnon:\t     100 kB\nRssFile:\t    1300 kB\n\
         RssShmem:\t       0 kB\nVmData:\t     360 kB\nVmStk:\t     132 kB\nVmExe:\t      20 kB\n\
         VmLib:\t    1528 kB\nVmPTE:\t      40 kB\nVmSwap:\t       0 kB\nHugetlbPages:\t       0 kB\n\
         CoreDumping:\t0\nTHP_enabled:\t1\nThreads:\t1\nSigQ:\t0/24001\n\
         SigPnd:\t0000000000000000\nShdPnd:\t0000000000000000\nSigBlk:\t0000000000000000\n\
         SigIgn:\t0000000000000000\nSigCgt:\t0000000000000000\nCapInh:\t0000000000000000\n\
         CapPrm:\t000001ffffffffff\nCapEff:\t000001ffffffffff\nCapBnd:\t000001ffffffffff\n\
         CapAmb:\t0000000000000000\nNoNewPrivs:\t0\nSeccomp:\t0\nSeccomp_filters:\t0\n\
         Cpus_allowed:\t{cpus_allowed}\nCpus_allowed_list:\t0\n\
         Mems_allowed:\t00000000,00000001\nMems_allowed_list:\t0\n\
         voluntary_ctxt_switches:\t0\nnonvoluntary_ctxt_switches:\t0\n"
    )
}

/// A complete `/proc/<pid>/stat` line
fn stat_file(pid: i32) -> String {
    format!(
        "{pid} (proc{pid}) S 1 {pid} {pid} 0 -1 4194560 4732 0 10 0 18 23 0 0 20 0 1 0 31 \
         172843008 3200 18446744073709551615 1 1 0 0 0 0 0 4096 1260 0 0 0 17 0 0 0 0 0 0 \
         0 0 0 0 0 0 0 0\n"
    )
}

fn add_process(root: &Path, pid: i32, net: u64, cmdline: &str) {
    let dir = root.join(pid.to_string());
    std::fs::create_dir_all(dir.join("ns")).unwrap();
    symlink(format!("net:[{net}]"), dir.join("ns").join("net")).unwrap();
    std::fs::write(dir.join("status"), status_file(pid, "f")).unwrap();
    std::fs::write(dir.join("stat"), stat_file(pid)).unwrap();
    std::fs::write(dir.join("cmdline"), cmdline.replace(' ', "\0")).unwrap();
}

fn fake_proc() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    add_process(dir.path(), 1, 4_026_531_840, "/sbin/init splash");
    add_process(dir.path(), 50, 4_026_532_600, "/pause");
    add_process(dir.path(), 51, 4_026_532_600, "envoy --config-path /etc/envoy.yaml");
    dir
}

fn volans(proc_root: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_volans"));
    cmd.arg("--no-runtime").arg("--proc-root").arg(proc_root);
    cmd
}

#[test]
fn test_help_command() {
    Command::new(env!("CARGO_BIN_EXE_volans"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("namespaces"))
        .stdout(predicate::str::contains("interfaces"))
        .stdout(predicate::str::contains("processes"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("health"));
}

#[test]
fn test_version_command() {
    Command::new(env!("CARGO_BIN_EXE_volans"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("volans"));
}

#[test]
fn test_invalid_command() {
    Command::new(env!("CARGO_BIN_EXE_volans"))
        .arg("invalid")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_interfaces_requires_namespace() {
    Command::new(env!("CARGO_BIN_EXE_volans"))
        .arg("interfaces")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_rejects_malformed_namespace() {
    Command::new(env!("CARGO_BIN_EXE_volans"))
        .args(["processes", "net:[abc]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_missing_proc_root_fails() {
    volans(Path::new("/nonexistent/proc"))
        .arg("namespaces")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_missing_docker_socket_still_lists() {
    let dir = fake_proc();
    Command::new(env!("CARGO_BIN_EXE_volans"))
        .arg("--proc-root")
        .arg(dir.path())
        .arg("--docker-socket")
        .arg(dir.path().join("docker.sock"))
        .arg("namespaces")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 2 namespace(s)"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = fake_proc();
    volans(dir.path())
        .args(["--config", "/nonexistent/volans.json", "namespaces"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_namespaces_table() {
    let dir = fake_proc();
    volans(dir.path())
        .arg("namespaces")
        .assert()
        .success()
        .stdout(predicate::str::contains("4026532600"))
        .stdout(predicate::str::contains("Total: 2 namespace(s)"));
}

#[test]
fn test_namespaces_json() {
    let dir = fake_proc();
    let output = volans(dir.path())
        .args(["namespaces", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 2);
    assert_eq!(rows[1]["namespace_id"], 4_026_532_600_u64);
    assert_eq!(rows[1]["member_count"], 2);
}

#[test]
fn test_processes_truncates_cmdline() {
    let dir = fake_proc();
    volans(dir.path())
        .args(["processes", "net:[4026532600]"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/pause"))
        .stdout(predicate::str::contains("envoy --config-path"))
        .stdout(predicate::str::contains("/etc/envoy.yaml").not())
        .stdout(predicate::str::contains("1111"));
}

#[test]
fn test_config_file_overrides_width() {
    let dir = fake_proc();
    let config = dir.path().join("volans.json");
    std::fs::write(&config, r#"{"cmdline_width": 5}"#).unwrap();

    volans(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["processes", "4026532600", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"envoy\""));
}

#[test]
fn test_inspect_json() {
    let dir = fake_proc();
    let output = volans(dir.path())
        .args(["inspect", "4026532600", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let inspection: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(inspection["namespace_id"], 4_026_532_600_u64);
    assert_eq!(inspection["processes"].as_array().unwrap().len(), 2);
    assert!(inspection["owner_pod"].is_null());
}

#[test]
fn test_health_without_runtime() {
    let dir = fake_proc();
    volans(dir.path())
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("DISABLED"))
        .stdout(predicate::str::contains("3 processes in 2 namespaces"));
}

#[test]
fn test_logs_go_to_stderr() {
    let dir = fake_proc();
    volans(dir.path())
        .args(["--verbose", "namespaces", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["))
        .stderr(predicate::str::contains("Engine initialized"));
}
