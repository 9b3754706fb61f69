// ferrous-gap/tests/merge_cli.rs
//
// Runs the `merge` subcommand on small hit files.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use flate2::Compression;
use flate2::write::GzEncoder;

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ferrous-gap"))
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

const BUILDS: &str = "# name length\nchr1 1000\nchr2 300\n";

const HITS: &str = "\
# query_id query_length frame query_pos seq_id build_pos
1 30 + 0 0 100
1 30 + 6 0 106
1 30 + 12 0 112
1 30 - 2 1 50
2 40 + 0 0 700
";

fn sorted_lines(path: &Path) -> Vec<String> {
    let mut lines: Vec<String> = fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    lines
}

#[test]
fn test_merge_writes_tsv() {
    let dir = tempfile::tempdir().unwrap();
    let builds = write_file(dir.path(), "builds.txt", BUILDS);
    let hits = write_file(dir.path(), "hits.txt", HITS);
    let out = dir.path().join("regions.tsv");

    let status = Command::new(binary())
        .args(["merge", "-w", "4", "-g", "4", "-e", "2", "-t", "2", "-v", "1"])
        .arg("--builds")
        .arg(&builds)
        .arg("--hits")
        .arg(&hits)
        .arg("-o")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    assert_eq!(
        sorted_lines(&out),
        vec![
            "1\t+\t0\t100\t115\t0\t15\t*",
            "1\t-\t1\t50\t53\t2\t5\t*",
            "2\t+\t0\t700\t703\t0\t3\t*",
        ]
    );
}

#[test]
fn test_merge_scored_from_gzip() {
    let dir = tempfile::tempdir().unwrap();
    let builds = write_file(dir.path(), "builds.txt", BUILDS);
    let hits = dir.path().join("hits.txt.gz");
    let mut enc = GzEncoder::new(File::create(&hits).unwrap(), Compression::default());
    enc.write_all(HITS.as_bytes()).unwrap();
    enc.finish().unwrap();
    let out = dir.path().join("regions.tsv");

    // Only the merged region on query 1 covers enough of its query to pass.
    let status = Command::new(binary())
        .args(["merge", "-w", "4", "-g", "4", "-e", "2", "-T", "5", "-v", "1"])
        .arg("--builds")
        .arg(&builds)
        .arg("--hits")
        .arg(&hits)
        .arg("-o")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let lines = sorted_lines(&out);
    assert_eq!(lines.len(), 1, "{:?}", lines);
    assert!(lines[0].starts_with("1\t+\t0\t100\t115\t0\t15\t"));
    let penalty: f64 = lines[0].rsplit('\t').next().unwrap().parse().unwrap();
    assert!(penalty <= 5.0);
}

#[test]
fn test_merge_rejects_bad_hits() {
    let dir = tempfile::tempdir().unwrap();
    let builds = write_file(dir.path(), "builds.txt", BUILDS);
    let hits = write_file(dir.path(), "hits.txt", "1 30 + 0 9 100\n");
    let out = dir.path().join("regions.tsv");

    let status = Command::new(binary())
        .args(["merge", "-w", "4", "-g", "4", "-e", "2", "-v", "1"])
        .arg("--builds")
        .arg(&builds)
        .arg("--hits")
        .arg(&hits)
        .arg("-o")
        .arg(&out)
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn test_merge_rejects_invalid_options() {
    let dir = tempfile::tempdir().unwrap();
    let builds = write_file(dir.path(), "builds.txt", BUILDS);
    let hits = write_file(dir.path(), "hits.txt", HITS);

    let status = Command::new(binary())
        .args(["merge", "-w", "4", "-s", "6", "-v", "1"])
        .arg("--builds")
        .arg(&builds)
        .arg("--hits")
        .arg(&hits)
        .status()
        .unwrap();
    assert!(!status.success());
}
