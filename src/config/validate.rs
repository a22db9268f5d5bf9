// src/config/validate.rs

use std::collections::HashSet;
use std::path::Path;

use crate::config::model::{AppConfig, RawAppConfig, TaskSection};
use crate::errors::{Result, TaskgateError};
use crate::task::{GitGlobSpec, GlobSpec, GoSourceSpec, InputDeclaration, Task};

impl TryFrom<RawAppConfig> for AppConfig {
    type Error = TaskgateError;

    fn try_from(raw: RawAppConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(AppConfig::new_unchecked(raw.name, raw.task))
    }
}

impl AppConfig {
    /// Build tasks declared in the config file at `config_file`.
    pub fn into_tasks(self, config_file: &Path) -> Vec<Task> {
        let directory = config_file.parent().unwrap_or(Path::new("/")).to_path_buf();
        let app_name = self.name().to_string();

        self.tasks()
            .iter()
            .map(|section| {
                let mut task = Task::new(&app_name, &section.name, &directory, config_file);
                if let Some(input) = &section.input {
                    task.inputs.extend(input.files.iter().map(|f| {
                        InputDeclaration::Glob(GlobSpec {
                            paths: f.paths.clone(),
                            optional: f.optional,
                        })
                    }));
                    task.inputs.extend(input.git_files.iter().map(|f| {
                        InputDeclaration::GitGlob(GitGlobSpec {
                            paths: f.paths.clone(),
                            optional: f.optional,
                        })
                    }));
                    task.inputs.extend(input.golang_sources.iter().map(|g| {
                        InputDeclaration::GoSource(GoSourceSpec {
                            queries: g.queries.clone(),
                            environment: g.environment.clone(),
                            tests: g.tests,
                            optional: g.optional,
                        })
                    }));
                    task.excluded_files = input.excluded_files.paths.clone();
                }
                task
            })
            .collect()
    }
}

fn validate_raw_config(cfg: &RawAppConfig) -> Result<()> {
    validate_name("application", &cfg.name)?;
    ensure_has_tasks(cfg)?;
    validate_unique_task_names(cfg)?;
    for task in &cfg.task {
        validate_name("task", &task.name)?;
        validate_task_inputs(task)?;
    }
    Ok(())
}

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TaskgateError::config(format!("{kind} name must not be empty")));
    }
    if name.contains('.') || name.contains(char::is_whitespace) {
        return Err(TaskgateError::config(format!(
            "{kind} name '{name}' must not contain '.' or whitespace"
        )));
    }
    Ok(())
}

fn ensure_has_tasks(cfg: &RawAppConfig) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskgateError::config(format!(
            "application '{}' must contain at least one [[task]] section",
            cfg.name
        )));
    }
    Ok(())
}

fn validate_unique_task_names(cfg: &RawAppConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for task in &cfg.task {
        if !seen.insert(task.name.as_str()) {
            return Err(TaskgateError::config(format!(
                "task '{}' is declared more than once",
                task.name
            )));
        }
    }
    Ok(())
}

fn validate_task_inputs(task: &TaskSection) -> Result<()> {
    let Some(input) = &task.input else {
        return Ok(());
    };

    if input.is_empty() {
        return Err(TaskgateError::config(format!(
            "task '{}' has an [task.input] section without any inputs",
            task.name
        )));
    }

    let patterns = input
        .files
        .iter()
        .map(|f| ("files", &f.paths))
        .chain(input.git_files.iter().map(|f| ("git_files", &f.paths)));
    for (section, paths) in patterns {
        if paths.is_empty() {
            return Err(TaskgateError::config(format!(
                "task '{}': input.{section} entry has no paths",
                task.name
            )));
        }
        for p in paths {
            validate_pattern(&task.name, p)?;
        }
    }

    for p in &input.excluded_files.paths {
        validate_pattern(&task.name, p)?;
    }

    for go in &input.golang_sources {
        if go.queries.is_empty() {
            return Err(TaskgateError::config(format!(
                "task '{}': input.golang_sources entry has no queries",
                task.name
            )));
        }
        if let Some(q) = go.queries.iter().find(|q| q.trim().is_empty()) {
            return Err(TaskgateError::config(format!(
                "task '{}': empty go source query {q:?}",
                task.name
            )));
        }
        if let Some(e) = go.environment.iter().find(|e| !is_env_entry(e)) {
            return Err(TaskgateError::config(format!(
                "task '{}': environment entry '{e}' is not in KEY=VALUE form",
                task.name
            )));
        }
    }
    Ok(())
}

fn validate_pattern(task: &str, pattern: &str) -> Result<()> {
    if pattern.trim().is_empty() {
        return Err(TaskgateError::config(format!("task '{task}': empty path pattern")));
    }
    if pattern.matches("**").count() > 1 {
        return Err(TaskgateError::config(format!(
            "task '{task}': pattern '{pattern}' contains '**' more than once"
        )));
    }
    Ok(())
}

fn is_env_entry(entry: &str) -> bool {
    matches!(entry.split_once('='), Some((key, _)) if !key.is_empty())
}
