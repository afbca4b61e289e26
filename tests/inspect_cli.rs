use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn combined_output(output: &std::process::Output) -> String {
    format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(tag);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn info_payload(creator: &str, drive_type: u8, write_protected: u8) -> Vec<u8> {
    let mut payload = vec![0u8; 37];
    payload[0] = 1; // info_version
    let bytes = creator.as_bytes();
    payload[1..1 + bytes.len()].copy_from_slice(bytes);
    for b in &mut payload[1 + bytes.len()..33] {
        *b = b' ';
    }
    payload[33] = drive_type;
    payload[34] = write_protected;
    payload
}

fn write_container(path: &Path, chunks: &[Vec<u8>]) {
    let mut bytes = b"A2R2\xff\x0a\x0d\x0a".to_vec();
    for c in chunks {
        bytes.extend_from_slice(c);
    }
    fs::write(path, bytes).expect("write container");
}

#[test]
fn inspect_prints_info_and_meta_records() {
    let dir = TempDir::new().expect("tempdir");
    let container = dir.path().join("wordperfect.a2r");
    write_container(
        &container,
        &[
            chunk(b"INFO", &info_payload("Sculptured Software", 4, 1)),
            chunk(b"RWCP", &[0u8; 256]),
            chunk(b"META", b"title\tWordPerfect\nlanguage\tEnglish\n"),
        ],
    );

    let output = Command::new(assert_cmd::cargo::cargo_bin!("fluxcat"))
        .arg("inspect")
        .arg(&container)
        .output()
        .expect("inspect runs");

    assert!(output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("Sculptured Software"), "{text}");
    assert!(text.contains("5.25\u{2033} DS 40trk"), "{text}");
    assert!(text.contains("write_protected:   true"), "{text}");
    assert!(text.contains("WordPerfect"), "{text}");
    assert!(text.contains("English (code: en)"), "{text}");
}

#[test]
fn inspect_json_emits_structured_records() {
    let dir = TempDir::new().expect("tempdir");
    let container = dir.path().join("disk.a2r");
    write_container(
        &container,
        &[chunk(b"META", b"publisher\tSSI\nside\tA\nbogus-line\n")],
    );

    let output = Command::new(assert_cmd::cargo::cargo_bin!("fluxcat"))
        .arg("inspect")
        .arg(&container)
        .arg("--json")
        .output()
        .expect("inspect --json runs");

    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid JSON output");
    assert!(parsed["info"].is_null());
    assert_eq!(parsed["meta"]["publisher"], "SSI");
    assert_eq!(parsed["meta"]["side"], "A");
    assert!(parsed["meta"]["title"].is_null());
}

#[test]
fn inspect_fails_cleanly_on_truncated_container() {
    let dir = TempDir::new().expect("tempdir");
    let container = dir.path().join("truncated.a2r");

    let mut bytes = b"A2R2\xff\x0a\x0d\x0a".to_vec();
    bytes.extend_from_slice(b"META");
    bytes.extend_from_slice(&1000u32.to_le_bytes());
    bytes.extend_from_slice(&[b'x'; 50]);
    fs::write(&container, bytes).expect("write container");

    let output = Command::new(assert_cmd::cargo::cargo_bin!("fluxcat"))
        .arg("inspect")
        .arg(&container)
        .output()
        .expect("inspect runs");

    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("truncated"), "{text}");
}

#[test]
fn inspect_skips_unknown_chunks() {
    let dir = TempDir::new().expect("tempdir");
    let container = dir.path().join("oddball.a2r");
    write_container(
        &container,
        &[
            chunk(b"XXXX", &[0xAB; 1024]),
            chunk(b"INFO", &info_payload("Applesauce", 2, 0)),
        ],
    );

    let output = Command::new(assert_cmd::cargo::cargo_bin!("fluxcat"))
        .arg("inspect")
        .arg(&container)
        .output()
        .expect("inspect runs");

    assert!(output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("Applesauce"), "{text}");
    assert!(text.contains("META: absent"), "{text}");
}
