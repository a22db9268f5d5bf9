#![allow(dead_code)]

use std::path::Path;

use taskgate::task::{GitGlobSpec, GlobSpec, InputDeclaration, Task};

/// Builder for `Task` to simplify test setup.
///
/// The task directory is `<root>/<app>` and the config file
/// `<root>/<app>/.app.toml`.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(root: impl AsRef<Path>, app: &str, name: &str) -> Self {
        let dir = root.as_ref().join(app);
        let config = dir.join(".app.toml");
        Self {
            task: Task::new(app, name, dir, config),
        }
    }

    pub fn glob(mut self, patterns: &[&str]) -> Self {
        self.task.inputs.push(InputDeclaration::Glob(GlobSpec {
            paths: strings(patterns),
            optional: false,
        }));
        self
    }

    pub fn optional_glob(mut self, patterns: &[&str]) -> Self {
        self.task.inputs.push(InputDeclaration::Glob(GlobSpec {
            paths: strings(patterns),
            optional: true,
        }));
        self
    }

    pub fn git_glob(mut self, patterns: &[&str], optional: bool) -> Self {
        self.task.inputs.push(InputDeclaration::GitGlob(GitGlobSpec {
            paths: strings(patterns),
            optional,
        }));
        self
    }

    pub fn exclude(mut self, patterns: &[&str]) -> Self {
        self.task.excluded_files.extend(strings(patterns));
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
