// src/inputs/resolver.rs

//! Resolution of all declared inputs of one task.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::digest::FileHasher;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::inputs::{File, Inputs};
use crate::path_utils::normalize;
use crate::resolve::glob::build_globset;
use crate::resolve::{GitPathResolver, GlobResolver, GoSourceResolver, PackageLister};
use crate::task::{GitGlobSpec, GlobSpec, GoSourceSpec, InputDeclaration, Task};

/// Runs the glob, git-glob and Go-source resolvers for a task and turns the
/// deduplicated result into [`Inputs`].
#[derive(Debug, Clone)]
pub struct InputResolver {
    glob: GlobResolver,
    git: GitPathResolver,
    go: GoSourceResolver,
    hasher: Arc<dyn FileHasher>,
}

impl InputResolver {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        hasher: Arc<dyn FileHasher>,
        go_lister: Arc<dyn PackageLister>,
    ) -> Self {
        let glob = GlobResolver::new(fs);
        Self {
            git: GitPathResolver::new(glob.clone()),
            go: GoSourceResolver::new(go_lister, glob.clone()),
            glob,
            hasher,
        }
    }

    /// Resolve `task` into ordered, deduplicated file inputs.
    ///
    /// Order: git-glob matches, glob matches, Go sources, then the task's
    /// config file, which is always included.
    pub fn resolve(&self, repo_root: &Path, task: &Task) -> Result<Inputs> {
        let paths = self.resolve_paths(repo_root, task)?;
        let files = paths
            .iter()
            .map(|p| File::from_absolute(repo_root, p, Arc::clone(&self.hasher)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Inputs::new(files))
    }

    /// Like [`resolve`](Self::resolve) but returns the absolute paths only.
    #[instrument(skip_all, fields(task = %task.id()))]
    pub fn resolve_paths(&self, repo_root: &Path, task: &Task) -> Result<Vec<PathBuf>> {
        let dir = normalize(&task.directory);

        let mut globs: Vec<GlobSpec> = Vec::new();
        let mut git_globs: Vec<GitGlobSpec> = Vec::new();
        let mut go_sources: Vec<GoSourceSpec> = Vec::new();
        for decl in &task.inputs {
            match decl {
                InputDeclaration::Glob(spec) => globs.push(spec.clone()),
                InputDeclaration::GitGlob(spec) => git_globs.push(spec.clone()),
                InputDeclaration::GoSource(spec) => go_sources.push(spec.clone()),
            }
        }

        let go_paths = self
            .go
            .resolve(&dir, &go_sources)
            .map_err(|e| e.in_resolver("go source"))?;
        let git_paths = self
            .git
            .resolve(repo_root, &dir, &git_globs)
            .map_err(|e| e.in_resolver("git glob"))?;
        let glob_paths = self
            .glob
            .resolve(&dir, &globs)
            .map_err(|e| e.in_resolver("glob"))?;

        debug!(
            git_glob = git_paths.len(),
            glob = glob_paths.len(),
            go_source = go_paths.len(),
            "resolved declared inputs"
        );

        let excluded = if task.excluded_files.is_empty() {
            None
        } else {
            Some(build_globset(&dir, &task.excluded_files).map_err(|e| e.in_resolver("excluded files"))?)
        };

        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut out = Vec::new();
        for path in git_paths.into_iter().chain(glob_paths).chain(go_paths) {
            if excluded.as_ref().is_some_and(|set| set.is_match(&path)) {
                debug!("excluding {:?}", path);
                continue;
            }
            if seen.insert(path.clone()) {
                out.push(path);
            }
        }

        let config_file = normalize(&task.config_file);
        if seen.insert(config_file.clone()) {
            out.push(config_file);
        }

        info!(files = out.len(), "resolved task inputs");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::ContentHasher;
    use crate::fs::mock::MockFileSystem;
    use crate::resolve::{GoListCommand, GoPackage};

    #[derive(Debug)]
    struct FixedLister(Vec<GoPackage>);

    impl PackageLister for FixedLister {
        fn list(
            &self,
            _dir: &Path,
            _env: &[(String, String)],
            _tests: bool,
            _queries: &[String],
        ) -> Result<Vec<GoPackage>> {
            Ok(self.0.clone())
        }
    }

    fn fixture() -> (Arc<MockFileSystem>, Task) {
        let fs = MockFileSystem::new();
        fs.add_file("/r/app/.app.toml", "name = \"app\"");
        fs.add_file("/r/app/a.txt", "hi");
        fs.add_file("/r/app/b.txt", "bye");
        fs.add_file("/r/app/main.go", "package main");
        fs.add_file("/r/app/zz_gen.go", "package main");
        let task = Task::new("app", "build", "/r/app", "/r/app/.app.toml");
        (Arc::new(fs), task)
    }

    fn resolver(fs: Arc<MockFileSystem>, lister: Arc<dyn PackageLister>) -> InputResolver {
        let hasher = Arc::new(ContentHasher::new(fs.clone()));
        InputResolver::new(fs, hasher, lister)
    }

    fn paths(v: &[&str]) -> Vec<PathBuf> {
        v.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn config_file_is_always_appended() {
        let (fs, mut task) = fixture();
        task.inputs.push(InputDeclaration::Glob(GlobSpec {
            paths: vec!["*.txt".to_string()],
            optional: false,
        }));
        let r = resolver(fs, Arc::new(GoListCommand));

        let got = r.resolve_paths(Path::new("/r"), &task).unwrap();
        assert_eq!(
            got,
            paths(&["/r/app/a.txt", "/r/app/b.txt", "/r/app/.app.toml"])
        );
    }

    #[test]
    fn file_matched_twice_appears_once() {
        let (fs, mut task) = fixture();
        let main = GoPackage {
            import_path: "example.com/app".to_string(),
            dir: PathBuf::from("/r/app"),
            go_files: vec!["main.go".to_string(), "zz_gen.go".to_string()],
            ..Default::default()
        };
        task.inputs.push(InputDeclaration::GoSource(GoSourceSpec {
            queries: vec![".".to_string()],
            ..Default::default()
        }));
        task.inputs.push(InputDeclaration::Glob(GlobSpec {
            paths: vec!["*.go".to_string(), "main.go".to_string(), ".app.toml".to_string()],
            optional: false,
        }));
        let r = resolver(fs, Arc::new(FixedLister(vec![main])));

        let got = r.resolve_paths(Path::new("/r"), &task).unwrap();
        assert_eq!(
            got,
            paths(&["/r/app/main.go", "/r/app/zz_gen.go", "/r/app/.app.toml"])
        );
    }

    #[test]
    fn go_dependencies_outside_the_repository_are_inputs() {
        let (fs, mut task) = fixture();
        fs.add_file("/home/u/go/pkg/mod/github.com/x/y@v1.0.0/y.go", "package y");
        let app = GoPackage {
            import_path: "example.com/app".to_string(),
            dir: PathBuf::from("/r/app"),
            go_files: vec!["main.go".to_string()],
            imports: vec!["github.com/x/y".to_string()],
            ..Default::default()
        };
        let dep = GoPackage {
            import_path: "github.com/x/y".to_string(),
            dir: PathBuf::from("/home/u/go/pkg/mod/github.com/x/y@v1.0.0"),
            go_files: vec!["y.go".to_string()],
            dep_only: true,
            ..Default::default()
        };
        task.inputs.push(InputDeclaration::GoSource(GoSourceSpec {
            queries: vec![".".to_string()],
            ..Default::default()
        }));
        let r = resolver(fs, Arc::new(FixedLister(vec![app, dep])));

        let inputs = r.resolve(Path::new("/r"), &task).unwrap();
        let names: Vec<String> = inputs.iter().map(|i| i.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "app/main.go",
                "../home/u/go/pkg/mod/github.com/x/y@v1.0.0/y.go",
                "app/.app.toml",
            ]
        );
        assert!(inputs.digest().is_ok());
    }

    #[test]
    fn vanished_file_error_names_the_input() {
        let (fs, mut task) = fixture();
        task.inputs.push(InputDeclaration::Glob(GlobSpec {
            paths: vec!["a.txt".to_string()],
            optional: false,
        }));
        let hasher = Arc::new(ContentHasher::new(Arc::new(MockFileSystem::new())));
        let r = InputResolver::new(fs, hasher, Arc::new(GoListCommand));

        let inputs = r.resolve(Path::new("/r"), &task).unwrap();
        let err = inputs.digest().unwrap_err();
        assert!(err.to_string().contains("app/a.txt"), "{err}");
    }

    #[test]
    fn excluded_files_are_dropped_but_not_the_config_file() {
        let (fs, mut task) = fixture();
        task.inputs.push(InputDeclaration::Glob(GlobSpec {
            paths: vec!["*".to_string()],
            optional: false,
        }));
        task.excluded_files = vec!["*_gen.go".to_string(), "*.toml".to_string()];
        let r = resolver(fs, Arc::new(GoListCommand));

        let got = r.resolve_paths(Path::new("/r"), &task).unwrap();
        assert_eq!(
            got,
            paths(&[
                "/r/app/a.txt",
                "/r/app/b.txt",
                "/r/app/main.go",
                "/r/app/.app.toml"
            ])
        );
    }

    #[test]
    fn errors_carry_resolver_context() {
        let (fs, mut task) = fixture();
        task.inputs.push(InputDeclaration::Glob(GlobSpec {
            paths: vec!["*.rs".to_string()],
            optional: false,
        }));
        let r = resolver(fs, Arc::new(GoListCommand));

        let err = r.resolve(Path::new("/r"), &task).unwrap_err();
        assert!(err.is_no_match());
        assert!(err.to_string().starts_with("resolving glob inputs failed"));
    }

    #[test]
    fn resolving_twice_is_deterministic() {
        let (fs, mut task) = fixture();
        task.inputs.push(InputDeclaration::Glob(GlobSpec {
            paths: vec!["**".to_string()],
            optional: false,
        }));
        let r = resolver(fs, Arc::new(GoListCommand));

        let first = r.resolve(Path::new("/r"), &task).unwrap();
        let second = r.resolve(Path::new("/r"), &task).unwrap();
        let names = |i: &Inputs| i.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        assert_eq!(names(&first), names(&second));
        assert_eq!(first.digest().unwrap(), second.digest().unwrap());
    }
}
