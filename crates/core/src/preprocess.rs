//! Textual include resolution for fragment shaders.
//!
//! Reference shaders pull shared spectral utility code in with a single
//! fixed directive, `#include "spectral.glsl"`. This is a one-shot string
//! substitution, not a preprocessor: the included text is never scanned
//! for further directives and no other file name is recognized.

use crate::error::FixtureError;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the shared spectral utility source.
pub const SPECTRAL_INCLUDE_FILE: &str = "spectral.glsl";

/// The literal directive replaced by the contents of [`SPECTRAL_INCLUDE_FILE`].
pub const INCLUDE_DIRECTIVE: &str = "#include \"spectral.glsl\"";

/// Final, compile-ready text for both shader stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSource {
    /// Pairs a vertex stage with an already-resolved fragment stage.
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Reads the fragment shader at `fragment_path`, resolves its include
    /// against the file's own directory, and pairs it with `vertex`.
    pub fn load(vertex: &str, fragment_path: &Path) -> Result<Self, FixtureError> {
        let text = fs::read_to_string(fragment_path)
            .map_err(|e| FixtureError::Io(format!("{}: {e}", fragment_path.display())))?;
        let dir = include_dir_for(fragment_path);
        let fragment = resolve_include(&text, &dir)?;
        Ok(Self::new(vertex, fragment))
    }
}

/// Returns true if `source` contains the include directive.
pub fn has_include(source: &str) -> bool {
    source.contains(INCLUDE_DIRECTIVE)
}

/// Replaces every occurrence of the directive with `include_text` in a
/// single pass. Text without the directive is returned unchanged.
pub fn substitute_include(source: &str, include_text: &str) -> String {
    source.replace(INCLUDE_DIRECTIVE, include_text)
}

/// Resolves the include directive in `source` against `include_dir`.
///
/// The include file is only read when the directive is present.
///
/// # Errors
///
/// Returns `FixtureError::MissingIncludeFile` if the directive is present
/// but `include_dir/spectral.glsl` does not exist, or `FixtureError::Io`
/// if it exists but cannot be read.
pub fn resolve_include(source: &str, include_dir: &Path) -> Result<String, FixtureError> {
    if !has_include(source) {
        return Ok(source.to_owned());
    }

    let path = include_dir.join(SPECTRAL_INCLUDE_FILE);
    if !path.is_file() {
        return Err(FixtureError::MissingIncludeFile { path });
    }

    let include_text = fs::read_to_string(&path)
        .map_err(|e| FixtureError::Io(format!("{}: {e}", path.display())))?;
    log::debug!(
        "resolved {} ({} bytes)",
        path.display(),
        include_text.len()
    );

    Ok(substitute_include(source, &include_text))
}

/// Directory the include is resolved in: the fragment file's parent, or
/// the current directory for a bare file name.
pub fn include_dir_for(fragment_path: &Path) -> PathBuf {
    match fragment_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FRAGMENT_WITH_INCLUDE: &str = "#version 330\n#include \"spectral.glsl\"\nout vec4 c;\nvoid main() { c = mix_colors(); }\n";

    #[test]
    fn substitute_replaces_directive_verbatim() {
        let out = substitute_include(FRAGMENT_WITH_INCLUDE, "vec4 mix_colors() { return vec4(1.0); }");
        assert!(!out.contains(INCLUDE_DIRECTIVE), "directive left in:\n{out}");
        assert!(
            out.contains("#version 330\nvec4 mix_colors() { return vec4(1.0); }\nout vec4 c;"),
            "include not spliced in place:\n{out}"
        );
    }

    #[test]
    fn substitute_does_not_rescan_included_text() {
        // An include file that itself contains the directive stays as-is.
        let out = substitute_include("A\n#include \"spectral.glsl\"\nB", "#include \"spectral.glsl\"");
        assert_eq!(out, "A\n#include \"spectral.glsl\"\nB");
    }

    #[test]
    fn other_includes_are_left_alone() {
        let src = "#include \"other.glsl\"\nvoid main() {}";
        assert_eq!(substitute_include(src, "XXX"), src);
        assert!(!has_include(src));
    }

    #[test]
    fn resolve_without_directive_does_not_touch_disk() {
        let dir = tempfile::tempdir().unwrap();
        let src = "void main() {}";
        let out = resolve_include(src, dir.path()).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn resolve_reads_sibling_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SPECTRAL_INCLUDE_FILE), "float spectral() { return 1.0; }").unwrap();

        let out = resolve_include(FRAGMENT_WITH_INCLUDE, dir.path()).unwrap();
        assert!(out.contains("float spectral() { return 1.0; }"));
        assert!(!out.contains(INCLUDE_DIRECTIVE));
    }

    #[test]
    fn resolve_fails_with_missing_include_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_include(FRAGMENT_WITH_INCLUDE, dir.path()).unwrap_err();
        match err {
            FixtureError::MissingIncludeFile { path } => {
                assert!(path.ends_with(SPECTRAL_INCLUDE_FILE), "unexpected path {path:?}");
            }
            other => panic!("expected MissingIncludeFile, got {other:?}"),
        }
    }

    #[test]
    fn load_resolves_against_fragment_directory() {
        let dir = tempfile::tempdir().unwrap();
        let frag = dir.path().join("shader.frag");
        fs::write(&frag, FRAGMENT_WITH_INCLUDE).unwrap();
        fs::write(dir.path().join(SPECTRAL_INCLUDE_FILE), "// shared").unwrap();

        let source = ShaderSource::load("VERTEX", &frag).unwrap();
        assert_eq!(source.vertex, "VERTEX");
        assert!(source.fragment.contains("// shared"));
    }

    #[test]
    fn load_reports_missing_fragment_as_io() {
        let dir = tempfile::tempdir().unwrap();
        let result = ShaderSource::load("VERTEX", &dir.path().join("absent.frag"));
        assert!(matches!(result, Err(FixtureError::Io(_))));
    }

    #[test]
    fn include_dir_for_bare_name_is_current_dir() {
        assert_eq!(include_dir_for(Path::new("a.frag")), PathBuf::from("."));
        assert_eq!(include_dir_for(Path::new("x/y/a.frag")), PathBuf::from("x/y"));
    }

    proptest! {
        #[test]
        fn text_without_directive_is_unchanged(src in "[a-zA-Z0-9 ;(){}\\n.]{0,200}") {
            prop_assert_eq!(substitute_include(&src, "INCLUDED"), src);
        }

        #[test]
        fn every_directive_is_resolved(prefix in "[a-z ]{0,20}", suffix in "[a-z ]{0,20}") {
            let src = format!("{prefix}{INCLUDE_DIRECTIVE}{suffix}{INCLUDE_DIRECTIVE}");
            let out = substitute_include(&src, "body");
            prop_assert!(!has_include(&out));
            prop_assert_eq!(out, format!("{prefix}body{suffix}body"));
        }
    }
}
