//! Module-specifier resolution (spec §4.4).
//!
//! Grounded on the teacher's `analyzer/resolvers.rs::{resolve_js_relative,
//! resolve_with_extensions}`: relative specifiers resolve against the
//! importing file's directory, try each extension in order, then fall back
//! to `base/index.<ext>`. Generalized here to also resolve absolute
//! (non-URL) specifiers against the project root, per spec.

use std::path::{Path, PathBuf};

const EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// Resolves `specifier` (as written in an import/re-export) to a project
/// file path relative to `project_root`, or `None` if it resolves outside
/// the project (an external module, spec §4.4).
pub fn resolve_specifier(
    importing_file: &Path,
    specifier: &str,
    project_root: &Path,
) -> Option<PathBuf> {
    let base = if specifier.starts_with('.') {
        let parent = importing_file.parent()?;
        parent.join(specifier)
    } else if specifier.starts_with('/') {
        project_root.join(specifier.trim_start_matches('/'))
    } else {
        // Bare specifier (npm package or path alias) - not a relative or
        // absolute-to-root path, never resolves inside the project.
        return None;
    };

    resolve_with_extensions(&base, project_root)
}

fn resolve_with_extensions(candidate: &Path, project_root: &Path) -> Option<PathBuf> {
    if candidate.extension().is_some() && candidate.exists() {
        return canonicalize_if_inside(candidate, project_root);
    }
    for ext in EXTENSIONS {
        let with_ext = candidate.with_extension(ext);
        if with_ext.exists() {
            return canonicalize_if_inside(&with_ext, project_root);
        }
    }
    for ext in EXTENSIONS {
        let index = candidate.join(format!("index.{ext}"));
        if index.exists() {
            return canonicalize_if_inside(&index, project_root);
        }
    }
    if candidate.exists() {
        return canonicalize_if_inside(candidate, project_root);
    }
    None
}

fn canonicalize_if_inside(path: &Path, project_root: &Path) -> Option<PathBuf> {
    let canonical = path.canonicalize().ok()?;
    let canonical_root = project_root.canonicalize().unwrap_or_else(|_| project_root.to_path_buf());
    if canonical.starts_with(&canonical_root) {
        Some(canonical)
    } else {
        // Resolves to a real file, but outside the project root - treated
        // as external per spec §4.4.
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn resolves_relative_specifier_with_extension_probing() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("a.ts"), "export const x = 1;").unwrap();
        fs::write(dir.path().join("b.ts"), "import { x } from './a';").unwrap();
        let resolved = resolve_specifier(&dir.path().join("b.ts"), "./a", dir.path());
        assert_eq!(resolved.unwrap(), dir.path().join("a.ts").canonicalize().unwrap());
    }

    #[test]
    fn resolves_directory_specifier_to_index() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/index.ts"), "export const y = 1;").unwrap();
        fs::write(dir.path().join("b.ts"), "import { y } from './sub';").unwrap();
        let resolved = resolve_specifier(&dir.path().join("b.ts"), "./sub", dir.path());
        assert_eq!(
            resolved.unwrap(),
            dir.path().join("sub/index.ts").canonicalize().unwrap()
        );
    }

    #[test]
    fn bare_specifier_is_external() {
        let dir = tempfile::TempDir::new().unwrap();
        let resolved = resolve_specifier(&dir.path().join("b.ts"), "react", dir.path());
        assert!(resolved.is_none());
    }

    #[test]
    fn unresolvable_relative_specifier_is_external() {
        let dir = tempfile::TempDir::new().unwrap();
        let resolved = resolve_specifier(&dir.path().join("b.ts"), "./missing", dir.path());
        assert!(resolved.is_none());
    }
}
