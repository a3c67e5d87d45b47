//! End-to-end CLI runs over a miniature benchmark.

use std::path::Path;
use std::process::Command;

fn write_benchmark(dir: &Path) -> std::path::PathBuf {
    let base = dir.join("mini");
    std::fs::write(
        base.with_extension("lpfs"),
        "\
Function leaf main 0 k 2 d 1024
TMOV 0 1 0 q0
1,1 H q0
2,1 MeasZ q0
",
    )
    .unwrap();
    std::fs::write(
        base.with_extension("freq"),
        "leaf 0 0 0 0 0 0 0 0 1\nmain 0 0 0 0 0 0 0 0 1\n",
    )
    .unwrap();
    std::fs::write(
        base.with_extension("cg"),
        "\
SIMD k=2 d=1024 leaf 2 1
leaf 0 r0
SIMD k=2 d=1024 main 1 0
",
    )
    .unwrap();
    base
}

fn tessera() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tessera"))
}

#[test]
fn route_writes_kq_report() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_benchmark(dir.path());

    let status = tessera()
        .arg("route")
        .arg(&base)
        .args(["--p", "4", "--usage", "--storage", "--ages"])
        .status()
        .unwrap();
    assert!(status.success());

    // Two logical ops at frequency 1: budget 0.5 > 1e-4, so level 0 and
    // physical qubits equal peak live qubits.
    let kq_path = dir
        .path()
        .join("simd_simulation")
        .join("mini.p.4.cap.inf.window.inf.kq");
    let kq = std::fs::read_to_string(&kq_path).unwrap();
    assert!(kq.starts_with("error rate: 10^-4\n"));
    assert!(kq.contains("concatenation level: 0\n"));

    let get = |key: &str| -> u64 {
        kq.lines()
            .find(|l| l.starts_with(key))
            .and_then(|l| l.rsplit(' ').next())
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| panic!("missing '{key}' in report"))
    };
    assert_eq!(get("logical KQ:"), 2);
    assert_eq!(
        get("physical kq:"),
        get("total cycles:") * get("max qubits:")
    );

    for ext in ["usage", "storage", "ages"] {
        let p = dir
            .path()
            .join("simd_simulation")
            .join(format!("mini.p.4.cap.inf.window.inf.{ext}"));
        assert!(p.exists(), "{ext} report written");
    }
}

#[test]
fn braid_writes_kq_report() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("mini");
    std::fs::write(
        base.with_extension("lpfs"),
        "\
Function leaf main 0 k 2 d 1024
1,1 H q0
2,1 CNOT q0 q1
3,1 CNOT q2 q3
",
    )
    .unwrap();
    std::fs::write(
        base.with_extension("freq"),
        "leaf 0 0 0 0 0 0 0 0 4\n",
    )
    .unwrap();

    let status = tessera()
        .arg("braid")
        .arg(&base)
        .args(["--p", "5", "--yx", "4", "--drop", "8"])
        .status()
        .unwrap();
    assert!(status.success());

    let kq_path = dir
        .path()
        .join("braid_simulation")
        .join("mini.p.5.yx.4.drop.8.kq");
    let kq = std::fs::read_to_string(&kq_path).unwrap();
    assert!(kq.starts_with("error rate: 10^-5\n"));
    assert!(kq.contains("code distance: "));
    assert!(kq.contains("logical KQ: 12\n"));
    assert!(kq_path.with_extension("kq.json").exists());
}

#[test]
fn sched_prints_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_benchmark(dir.path());

    let output = tessera()
        .arg("sched")
        .arg(&base)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("SIMD k=2 d=1024 leaf"));
    assert!(stdout.contains("leaf=1"));
    assert!(stdout.contains("SIMD k=2 d=1024 main"));
}

#[test]
fn missing_input_fails_with_exit_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = tessera()
        .arg("braid")
        .arg(dir.path().join("nope"))
        .args(["--p", "5"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}
