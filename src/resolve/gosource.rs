// src/resolve/gosource.rs

//! Go source-dependency closure.
//!
//! Queries are handed to `go list -deps`, and the files of every package
//! reachable through import edges from the queried packages are returned.
//! Standard library packages are skipped. Imports are visited in sorted
//! order so the result (and therefore the input digest) does not depend on
//! the order `go list` reports them in.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::errors::{Result, TaskgateError};
use crate::path_utils::normalize;
use crate::resolve::glob::GlobResolver;
use crate::task::GoSourceSpec;

/// Host variables the `go` tool needs to work at all. They are added to the
/// caller-supplied environment only if it does not set them itself.
pub const HOST_ENV_ALLOWLIST: &[&str] = &[
    "PATH",
    "HOME",
    "USERPROFILE",
    "LOCALAPPDATA",
    "TMPDIR",
    "TEMP",
    "TMP",
    "GOPATH",
    "GOROOT",
];

const FILE_QUERY_PREFIX: &str = "file=";
const FILEGLOB_QUERY_PREFIX: &str = "fileglob=";

/// Subset of the `go list -json` package record.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct GoPackage {
    pub import_path: String,
    pub dir: PathBuf,
    pub standard: bool,
    pub goroot: bool,
    pub dep_only: bool,
    pub imports: Vec<String>,
    pub test_imports: Vec<String>,
    #[serde(rename = "XTestImports")]
    pub x_test_imports: Vec<String>,
    pub go_files: Vec<String>,
    pub cgo_files: Vec<String>,
    pub c_files: Vec<String>,
    #[serde(rename = "CXXFiles")]
    pub cxx_files: Vec<String>,
    pub h_files: Vec<String>,
    pub s_files: Vec<String>,
    pub embed_files: Vec<String>,
    pub test_go_files: Vec<String>,
    #[serde(rename = "XTestGoFiles")]
    pub x_test_go_files: Vec<String>,
    pub error: Option<GoPackageError>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct GoPackageError {
    pub err: String,
}

impl GoPackage {
    /// Test variants (`p [p.test]`) and generated test mains (`p.test`).
    fn is_test_variant(&self) -> bool {
        self.import_path.contains(' ') || self.import_path.ends_with(".test")
    }

    fn is_standard(&self) -> bool {
        self.standard || self.goroot
    }

    fn source_files(&self, with_tests: bool) -> impl Iterator<Item = PathBuf> + '_ {
        let base = [
            &self.go_files,
            &self.cgo_files,
            &self.c_files,
            &self.cxx_files,
            &self.h_files,
            &self.s_files,
            &self.embed_files,
        ];
        let tests = with_tests.then_some([&self.test_go_files, &self.x_test_go_files]);

        base.into_iter()
            .chain(tests.into_iter().flatten())
            .flatten()
            .map(|name| normalize(&self.dir.join(name)))
    }
}

/// Source of the package graph.
pub trait PackageLister: Send + Sync + Debug {
    /// List the queried packages and all their dependencies.
    fn list(
        &self,
        dir: &Path,
        env: &[(String, String)],
        tests: bool,
        queries: &[String],
    ) -> Result<Vec<GoPackage>>;
}

/// [`PackageLister`] running `go list -e -json -deps`.
#[derive(Debug, Clone, Default)]
pub struct GoListCommand;

impl PackageLister for GoListCommand {
    #[instrument(skip_all, fields(dir = ?dir, tests))]
    fn list(
        &self,
        dir: &Path,
        env: &[(String, String)],
        tests: bool,
        queries: &[String],
    ) -> Result<Vec<GoPackage>> {
        let mut cmd = Command::new("go");
        cmd.arg("list").arg("-e").arg("-json").arg("-deps");
        if tests {
            cmd.arg("-test");
        }
        cmd.args(queries)
            .current_dir(dir)
            .env_clear()
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null());

        let command = format!("go list -e -json -deps {}", queries.join(" "));
        debug!(%command, "running go list");
        let out = cmd.output().map_err(|e| TaskgateError::Command {
            command: command.clone(),
            message: e.to_string(),
        })?;
        if !out.status.success() {
            return Err(TaskgateError::Command {
                command,
                message: format!(
                    "exit status {}: {}",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            });
        }

        serde_json::Deserializer::from_slice(&out.stdout)
            .into_iter::<GoPackage>()
            .map(|pkg| {
                pkg.map_err(|e| TaskgateError::Command {
                    command: command.clone(),
                    message: format!("decoding package list: {e}"),
                })
            })
            .collect()
    }
}

/// Resolves [`GoSourceSpec`] declarations to source file paths.
#[derive(Debug, Clone)]
pub struct GoSourceResolver {
    lister: Arc<dyn PackageLister>,
    glob: GlobResolver,
}

impl GoSourceResolver {
    pub fn new(lister: Arc<dyn PackageLister>, glob: GlobResolver) -> Self {
        Self { lister, glob }
    }

    /// Resolve all declarations with `dir` as the working directory of the
    /// `go` tool.
    pub fn resolve(&self, dir: &Path, specs: &[GoSourceSpec]) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for spec in specs {
            if spec.queries.is_empty() {
                continue;
            }
            let files = self.resolve_spec(dir, spec)?;
            if files.is_empty() && !spec.optional {
                return Err(TaskgateError::NoMatch {
                    kind: "go source query",
                    pattern: spec.queries.join(" "),
                });
            }
            out.extend(files);
        }
        Ok(out)
    }

    fn resolve_spec(&self, dir: &Path, spec: &GoSourceSpec) -> Result<Vec<PathBuf>> {
        let queries = self.expand_queries(dir, spec)?;
        if queries.is_empty() {
            // Only file globs that matched nothing, and the spec is optional.
            return Ok(Vec::new());
        }

        let env = build_environment(&spec.environment, |key| std::env::var(key).ok())?;
        let packages = self.lister.list(dir, &env, spec.tests, &queries)?;
        let files = collect_closure(&packages, spec.tests)?;

        info!(
            queries = ?queries,
            packages = packages.len(),
            files = files.len(),
            "resolved go source closure"
        );
        Ok(files)
    }

    /// Turn `file=` and `fileglob=` queries into package directory queries.
    fn expand_queries(&self, dir: &Path, spec: &GoSourceSpec) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut push = |q: String| {
            if seen.insert(q.clone()) {
                out.push(q);
            }
        };

        for raw in &spec.queries {
            let query = raw.trim();
            if query.is_empty() {
                return Err(TaskgateError::config("empty go source query"));
            }

            if let Some(file) = query.strip_prefix(FILE_QUERY_PREFIX) {
                if file.trim().is_empty() {
                    return Err(TaskgateError::config(format!("go source query '{query}' has no path")));
                }
                let path = normalize(&dir.join(file));
                push(package_dir_query(&path));
            } else if let Some(pattern) = query.strip_prefix(FILEGLOB_QUERY_PREFIX) {
                let matches = self.glob.resolve_pattern(dir, pattern)?;
                if matches.is_empty() && !spec.optional {
                    return Err(TaskgateError::NoMatch {
                        kind: "go source fileglob",
                        pattern: pattern.to_string(),
                    });
                }
                let dirs: BTreeSet<String> = matches.iter().map(|p| package_dir_query(p)).collect();
                dirs.into_iter().for_each(&mut push);
            } else {
                push(query.to_string());
            }
        }
        Ok(out)
    }
}

fn package_dir_query(file: &Path) -> String {
    file.parent()
        .unwrap_or(file)
        .to_string_lossy()
        .into_owned()
}

/// Merge the caller-supplied `KEY=VALUE` entries with the host allow-list.
///
/// `lookup` reads host variables; it is a parameter so tests do not depend
/// on the invoking shell.
pub fn build_environment<F>(entries: &[String], lookup: F) -> Result<Vec<(String, String)>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut env: Vec<(String, String)> = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some((key, value)) = entry.split_once('=') else {
            return Err(TaskgateError::config(format!(
                "environment entry '{entry}' is not in KEY=VALUE form"
            )));
        };
        if key.is_empty() {
            return Err(TaskgateError::config(format!(
                "environment entry '{entry}' has an empty name"
            )));
        }
        env.push((key.to_string(), value.to_string()));
    }

    for key in HOST_ENV_ALLOWLIST {
        if env.iter().any(|(k, _)| k == key) {
            continue;
        }
        if let Some(value) = lookup(key) {
            env.push((key.to_string(), value));
        }
    }
    Ok(env)
}

/// Depth-first walk from the queried packages, visiting imports in sorted
/// order, collecting the files of every non-standard package.
pub fn collect_closure(packages: &[GoPackage], with_tests: bool) -> Result<Vec<PathBuf>> {
    let by_path: BTreeMap<&str, &GoPackage> = packages
        .iter()
        .filter(|p| !p.is_test_variant())
        .map(|p| (p.import_path.as_str(), p))
        .collect();

    if let Some(pkg) = by_path.values().find(|p| p.error.is_some()) {
        let msg = pkg.error.as_ref().map(|e| e.err.as_str()).unwrap_or_default();
        return Err(TaskgateError::Command {
            command: "go list".to_string(),
            message: format!("package {}: {}", pkg.import_path, msg),
        });
    }

    let roots: Vec<&GoPackage> = by_path.values().copied().filter(|p| !p.dep_only).collect();

    let mut visited: HashSet<&str> = HashSet::new();
    let mut files = Vec::new();

    for root in roots {
        visit(root, with_tests, &by_path, &mut visited, &mut files);
    }

    Ok(files)
}

fn visit<'a>(
    pkg: &'a GoPackage,
    with_tests: bool,
    by_path: &BTreeMap<&str, &'a GoPackage>,
    visited: &mut HashSet<&'a str>,
    files: &mut Vec<PathBuf>,
) {
    if pkg.is_standard() || !visited.insert(pkg.import_path.as_str()) {
        return;
    }

    // Test files and test-only imports belong to the queried packages only;
    // `dep_only` is false exactly for those, however they are reached.
    let tests = with_tests && !pkg.dep_only;
    files.extend(pkg.source_files(tests));

    let mut imports: Vec<&str> = pkg.imports.iter().map(String::as_str).collect();
    if tests {
        imports.extend(pkg.test_imports.iter().map(String::as_str));
        imports.extend(pkg.x_test_imports.iter().map(String::as_str));
    }
    imports.sort_unstable();
    imports.dedup();
    for import in imports {
        match by_path.get(import) {
            Some(&dep) => visit(dep, with_tests, by_path, visited, files),
            None => debug!(import, "import not in package list (e.g. pseudo package \"C\")"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::sync::Mutex;

    fn pkg(path: &str, dir: &str, files: &[&str], imports: &[&str]) -> GoPackage {
        GoPackage {
            import_path: path.to_string(),
            dir: PathBuf::from(dir),
            imports: imports.iter().map(|s| s.to_string()).collect(),
            go_files: files.iter().map(|s| s.to_string()).collect(),
            dep_only: true,
            ..Default::default()
        }
    }

    fn graph(reverse_imports: bool) -> Vec<GoPackage> {
        let mut root = pkg(
            "example.com/app",
            "/r/app",
            &["main.go"],
            &["example.com/lib/b", "example.com/lib/a", "fmt"],
        );
        root.dep_only = false;
        root.test_go_files = vec!["main_test.go".to_string()];

        let mut a = pkg("example.com/lib/a", "/r/lib/a", &["a.go"], &["example.com/lib/c"]);
        let mut b = pkg("example.com/lib/b", "/r/lib/b", &["b.go"], &["example.com/lib/c", "os"]);
        let c = pkg("example.com/lib/c", "/r/lib/c", &["c.go", "c_amd64.s"], &[]);
        let mut fmt = pkg("fmt", "/usr/lib/go/src/fmt", &["print.go"], &[]);
        fmt.standard = true;

        if reverse_imports {
            root.imports.reverse();
            a.imports.reverse();
            b.imports.reverse();
        }

        let mut pkgs = vec![root, a, b, c, fmt];
        if reverse_imports {
            pkgs.reverse();
        }
        pkgs
    }

    fn paths(v: &[&str]) -> Vec<PathBuf> {
        v.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn closure_follows_imports_in_sorted_order_regardless_of_listing_order() {
        let forward = collect_closure(&graph(false), false).unwrap();
        let reversed = collect_closure(&graph(true), false).unwrap();

        let expected = paths(&[
            "/r/app/main.go",
            "/r/lib/a/a.go",
            "/r/lib/c/c.go",
            "/r/lib/c/c_amd64.s",
            "/r/lib/b/b.go",
        ]);
        assert_eq!(forward, expected);
        assert_eq!(reversed, expected);
    }

    #[test]
    fn test_files_only_for_queried_packages() {
        let mut pkgs = graph(false);
        pkgs[1].test_go_files = vec!["a_test.go".to_string()];
        let files = collect_closure(&pkgs, true).unwrap();
        assert!(files.contains(&PathBuf::from("/r/app/main_test.go")));
        assert!(!files.contains(&PathBuf::from("/r/lib/a/a_test.go")));
    }

    #[test]
    fn test_imports_of_queried_dependency_are_followed() {
        // a imports b; both are queried, so b is first reached through a.
        let mut a = pkg("example.com/a", "/r/a", &["a.go"], &["example.com/b"]);
        a.dep_only = false;
        let mut b = pkg("example.com/b", "/r/b", &["b.go"], &[]);
        b.dep_only = false;
        b.test_go_files = vec!["b_test.go".to_string()];
        b.test_imports = vec!["example.com/testhelper".to_string()];
        let helper = pkg("example.com/testhelper", "/r/testhelper", &["h.go"], &[]);

        let files = collect_closure(&[a, b, helper], true).unwrap();
        assert_eq!(
            files,
            paths(&["/r/a/a.go", "/r/b/b.go", "/r/b/b_test.go", "/r/testhelper/h.go"])
        );
    }

    #[test]
    fn package_errors_are_fatal() {
        let mut pkgs = graph(false);
        pkgs[2].error = Some(GoPackageError {
            err: "no Go files".to_string(),
        });
        let err = collect_closure(&pkgs, false).unwrap_err();
        assert!(err.to_string().contains("example.com/lib/b"));
    }

    #[test]
    fn environment_prefers_caller_values() {
        let host = |key: &str| match key {
            "PATH" => Some("/host/bin".to_string()),
            "HOME" => Some("/home/host".to_string()),
            "SECRET" => Some("leak".to_string()),
            _ => None,
        };
        let env =
            build_environment(&["HOME=/build".to_string(), "CGO_ENABLED=0".to_string()], host)
                .unwrap();
        assert_eq!(
            env,
            vec![
                ("HOME".to_string(), "/build".to_string()),
                ("CGO_ENABLED".to_string(), "0".to_string()),
                ("PATH".to_string(), "/host/bin".to_string()),
            ]
        );

        assert!(build_environment(&["NOVALUE".to_string()], host).is_err());
    }

    #[derive(Debug, Default)]
    struct RecordingLister {
        queries: Mutex<Vec<Vec<String>>>,
        packages: Vec<GoPackage>,
    }

    impl PackageLister for RecordingLister {
        fn list(
            &self,
            _dir: &Path,
            _env: &[(String, String)],
            _tests: bool,
            queries: &[String],
        ) -> Result<Vec<GoPackage>> {
            self.queries.lock().unwrap().push(queries.to_vec());
            Ok(self.packages.clone())
        }
    }

    #[test]
    fn file_queries_are_turned_into_package_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("/r/app/cmd/main.go", "package main");
        fs.add_file("/r/app/cmd/flags.go", "package main");
        fs.add_file("/r/app/pkg/util.go", "package pkg");

        let lister = Arc::new(RecordingLister {
            packages: graph(false),
            ..Default::default()
        });
        let resolver = GoSourceResolver::new(lister.clone(), GlobResolver::new(Arc::new(fs)));
        let spec = GoSourceSpec {
            queries: vec![
                "fileglob=**/*.go".to_string(),
                "file=cmd/main.go".to_string(),
                "./...".to_string(),
            ],
            ..Default::default()
        };

        let files = resolver.resolve(Path::new("/r/app"), &[spec]).unwrap();
        assert_eq!(files.len(), 5);
        assert_eq!(
            lister.queries.lock().unwrap()[0],
            vec![
                "/r/app/cmd".to_string(),
                "/r/app/pkg".to_string(),
                "./...".to_string()
            ]
        );
    }

    #[test]
    fn empty_query_is_a_config_error() {
        let resolver = GoSourceResolver::new(
            Arc::new(RecordingLister::default()),
            GlobResolver::new(Arc::new(MockFileSystem::new())),
        );
        let spec = GoSourceSpec {
            queries: vec!["  ".to_string()],
            ..Default::default()
        };
        assert!(resolver
            .resolve(Path::new("/r/app"), &[spec])
            .unwrap_err()
            .is_config_error());
    }

    #[test]
    fn empty_closure_respects_optional_flag() {
        let resolver = GoSourceResolver::new(
            Arc::new(RecordingLister::default()),
            GlobResolver::new(Arc::new(MockFileSystem::new())),
        );
        let mut spec = GoSourceSpec {
            queries: vec!["./...".to_string()],
            ..Default::default()
        };
        assert!(resolver
            .resolve(Path::new("/r/app"), &[spec.clone()])
            .unwrap_err()
            .is_no_match());

        spec.optional = true;
        assert!(resolver.resolve(Path::new("/r/app"), &[spec]).unwrap().is_empty());
    }

    #[test]
    fn decodes_go_list_json_stream() {
        let stream = br#"{"ImportPath":"fmt","Dir":"/go/src/fmt","Standard":true,"Goroot":true,"DepOnly":true,"GoFiles":["print.go"]}
{"ImportPath":"example.com/app","Dir":"/r/app","GoFiles":["main.go"],"XTestGoFiles":["x_test.go"],"Imports":["fmt"]}"#;
        let pkgs: Vec<GoPackage> = serde_json::Deserializer::from_slice(stream)
            .into_iter::<GoPackage>()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(pkgs.len(), 2);
        assert!(pkgs[0].standard && pkgs[0].dep_only);
        assert_eq!(pkgs[1].x_test_go_files, vec!["x_test.go".to_string()]);
        assert_eq!(
            collect_closure(&pkgs, true).unwrap(),
            paths(&["/r/app/main.go", "/r/app/x_test.go"])
        );
    }
}
