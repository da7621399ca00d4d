//! Path sanitization
//!
//! Stripping separators from a full path collapses its directory structure, so
//! [`sanitize_path`] is only ever applied to single components (file names of
//! acquired files). Full paths go through [`normalize`], which is purely lexical.

use std::path::{Component, Path, PathBuf};

/// Characters that are invalid in file names on at least one supported platform
pub const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Remove every invalid character, then normalize the remaining text.
///
/// The output never contains any of [`INVALID_CHARS`] and the function is
/// idempotent. With separators gone the input is a single segment, so the
/// normalization step only maps the empty string to `"."`.
pub fn sanitize_path(path: &str) -> String {
    let stripped: String = path.chars().filter(|c| !INVALID_CHARS.contains(c)).collect();
    if stripped.is_empty() {
        ".".to_string()
    } else {
        stripped
    }
}

/// Sanitize a file name for use inside a working directory.
///
/// Returns `None` when nothing usable remains (`""`, `"."`, `".."`).
pub fn sanitize_component(name: &str) -> Option<String> {
    let cleaned = sanitize_path(name.trim());
    match cleaned.as_str() {
        "." | ".." => None,
        _ => Some(cleaned),
    }
}

/// Join a sanitized file name onto `dir`, falling back to `fallback` if the
/// name sanitizes to nothing.
pub fn join_component(dir: &Path, name: &str, fallback: &str) -> PathBuf {
    match sanitize_component(name) {
        Some(clean) => dir.join(clean),
        None => dir.join(fallback),
    }
}

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding normal segment. Leading `..` on a relative path are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_all_invalid_chars() {
        let input = r#"a<b>c:d"e/f\g|h?i*j"#;
        let out = sanitize_path(input);
        assert_eq!(out, "abcdefghij");
        assert!(!out.chars().any(|c| INVALID_CHARS.contains(&c)));
    }

    #[test]
    fn test_sanitize_idempotent() {
        let samples = [
            "",
            ".",
            "..",
            "song.mp3",
            "a/b/../c",
            r#"C:\Music\"Best Of"\track?.mp3"#,
            "***",
            "  spaced name .mp3",
        ];
        for s in samples {
            let once = sanitize_path(s);
            assert_eq!(sanitize_path(&once), once, "not idempotent for {:?}", s);
            assert!(!once.chars().any(|c| INVALID_CHARS.contains(&c)));
        }
    }

    #[test]
    fn test_empty_becomes_current_dir() {
        assert_eq!(sanitize_path(""), ".");
        assert_eq!(sanitize_path("/\\"), ".");
    }

    #[test]
    fn test_component_rejects_dot_segments() {
        assert_eq!(sanitize_component(".."), None);
        assert_eq!(sanitize_component("/"), None);
        assert_eq!(
            sanitize_component("My Song: Live?.mp3").as_deref(),
            Some("My Song Live.mp3")
        );
    }

    #[test]
    fn test_join_component_keeps_directory_structure() {
        let dir = Path::new("/work/input");
        assert_eq!(
            join_component(dir, "a/b.mp3", "download.mp3"),
            PathBuf::from("/work/input/ab.mp3")
        );
        assert_eq!(
            join_component(dir, "..", "download.mp3"),
            PathBuf::from("/work/input/download.mp3")
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }
}
