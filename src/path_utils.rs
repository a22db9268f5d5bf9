// src/path_utils.rs

//! Path helpers shared by the resolvers and the input model.

use std::path::{Component, Path, PathBuf};

/// Path of `path` relative to `root`, computed lexically.
///
/// - Inside `root` this is a plain `strip_prefix`.
/// - Outside `root` the result starts with `..` components, e.g.
///   `/r` + `/home/u/go/pkg/mod/x/y.go` gives `../home/u/go/pkg/mod/x/y.go`.
///
/// Returns `None` if the two paths share no root (one relative and one
/// absolute, different drive prefixes) or `root` still contains `..` after
/// normalization.
pub fn relative_path(root: &Path, path: &Path) -> Option<PathBuf> {
    let root = normalize(root);
    let path = normalize(path);
    if root.is_absolute() != path.is_absolute() {
        return None;
    }

    let root_parts: Vec<Component> = root.components().collect();
    let path_parts: Vec<Component> = path.components().collect();
    let common = root_parts
        .iter()
        .zip(&path_parts)
        .take_while(|(a, b)| a == b)
        .count();

    if common == 0 && root.is_absolute() {
        return None;
    }
    if root_parts[common..]
        .iter()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return None;
    }

    let mut out = PathBuf::new();
    for _ in &root_parts[common..] {
        out.push("..");
    }
    for part in &path_parts[common..] {
        out.push(part.as_os_str());
    }
    Some(out)
}

pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Lexically resolve `.` and `..` components without touching the
/// filesystem, so one file always has one spelling.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_inside_root() {
        assert_eq!(
            relative_path(Path::new("/r"), Path::new("/r/app/./a.txt")),
            Some(PathBuf::from("app/a.txt"))
        );
    }

    #[test]
    fn relative_path_outside_root_climbs_with_parent_components() {
        assert_eq!(
            relative_path(
                Path::new("/home/u/src/repo"),
                Path::new("/home/u/go/pkg/mod/x@v1/y.go")
            ),
            Some(PathBuf::from("../../go/pkg/mod/x@v1/y.go"))
        );
        assert_eq!(
            relative_path(Path::new("/r"), Path::new("/elsewhere/x")),
            Some(PathBuf::from("../elsewhere/x"))
        );
    }

    #[test]
    fn relative_path_needs_a_shared_root() {
        assert_eq!(relative_path(Path::new("/r"), Path::new("app/a.txt")), None);
    }

    #[test]
    fn normalize_removes_dot_components() {
        assert_eq!(
            normalize(Path::new("/r/app/./../lib/x.go")),
            PathBuf::from("/r/lib/x.go")
        );
        assert_eq!(normalize(Path::new("/r/app/.")), PathBuf::from("/r/app"));
    }
}
