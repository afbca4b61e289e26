use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const IMG_SUFFIXES: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".bmp"];
pub const FLUX_SUFFIX: &str = ".a2r";

/// Streaming md5 of one file, lowercase hex.
pub fn md5_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut context = md5::Context::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        context.consume(&buf[..n]);
    }
    Ok(format!("{:x}", context.compute()))
}

/// Lowercased dot-prefixed extension, if any.
pub fn suffix_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}

pub fn is_image_suffix(suffix: &str) -> bool {
    IMG_SUFFIXES.contains(&suffix)
}

pub fn folder_basename(p: &Path) -> String {
    p.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "root".to_string())
}

/// Archive-identifier sanitizer: lowercase, spaces to "-", anything outside
/// [a-z0-9_-] to "-", runs of "-" collapsed, trailing "-" dropped.
pub fn sanitize_identifier(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.to_lowercase().chars() {
        let mapped = match ch {
            'a'..='z' | '0'..='9' | '_' | '-' => ch,
            _ => '-',
        };
        if mapped == '-' && out.ends_with('-') {
            continue;
        }
        out.push(mapped);
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn sanitizes_identifiers() {
        assert_eq!(
            sanitize_identifier("WordPerfect Victor 1984"),
            "wordperfect-victor-1984"
        );
        assert_eq!(
            sanitize_identifier("Lotus 1-2-3 (v2.01)!"),
            "lotus-1-2-3-v2-01"
        );
        assert_eq!(sanitize_identifier("trailing junk   "), "trailing-junk");
        assert_eq!(sanitize_identifier("keep_under_scores"), "keep_under_scores");
    }

    #[test]
    fn suffix_is_lowercased_and_dotted() {
        assert_eq!(
            suffix_of(&PathBuf::from("DISK.A2R")).as_deref(),
            Some(".a2r")
        );
        assert_eq!(suffix_of(&PathBuf::from("no_suffix")), None);
        assert!(is_image_suffix(".jpg"));
        assert!(!is_image_suffix(".zip"));
    }

    #[test]
    fn md5_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello world").unwrap();
        assert_eq!(md5_file(&path).unwrap(), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }
}
