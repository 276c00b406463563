use debugtree::storage::node::{InternalPageBuilder, LeafPageBuilder};
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn debugtree() -> Command {
    Command::new(env!("CARGO_BIN_EXE_debugtree"))
}

#[test]
fn missing_argument_prints_usage() {
    let output = debugtree().output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("Usage: "), "got {:?}", stdout);
}

#[test]
fn unopenable_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = debugtree().arg(dir.path().join("missing.db")).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Error: cannot open"), "got {:?}", stderr);
}

#[test]
fn directory_is_an_open_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = debugtree().arg(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Error: cannot open"), "got {:?}", stderr);
    assert!(stderr.contains("not a regular file"), "got {:?}", stderr);
}

// `/proc/self/mem` is a regular file whose first page is unmapped, so reading
// it fails with EIO after a successful open.
#[cfg(target_os = "linux")]
#[test]
fn read_error_exits_one() {
    let output = debugtree().arg("/proc/self/mem").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.lines().any(|l| l.starts_with("Error: ")), "got {:?}", stderr);
    assert!(!stderr.contains("cannot open"), "got {:?}", stderr);
}

#[test]
fn dumps_pages_and_exits_zero() {
    let mut file = NamedTempFile::new().unwrap();
    let root = InternalPageBuilder::new()
        .is_root(true)
        .right_child(2)
        .cell(1, 10)
        .build()
        .unwrap();
    file.write_all(&root.data).unwrap();
    file.write_all(&LeafPageBuilder::new().parent(0).num_cells(3).build().data).unwrap();
    file.write_all(&LeafPageBuilder::new().parent(0).num_cells(4).build().data).unwrap();
    file.flush().unwrap();

    let output = debugtree().arg(file.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "Page 0: INTERNAL, num_keys=1, right_child=2, children: 1 \n\
         Page 1: LEAF, num_cells=3\n\
         Page 2: LEAF, num_cells=4\n"
    );
}

#[test]
fn empty_file_exits_zero() {
    let file = NamedTempFile::new().unwrap();
    let output = debugtree().arg(file.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
}

#[test]
fn max_pages_flag_limits_output() {
    let mut file = NamedTempFile::new().unwrap();
    for n in 0..3 {
        file.write_all(&LeafPageBuilder::new().num_cells(n).build().data).unwrap();
    }
    file.flush().unwrap();

    let output = debugtree()
        .args(["--max-pages", "1"])
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "Page 0: LEAF, num_cells=0\n");
}
