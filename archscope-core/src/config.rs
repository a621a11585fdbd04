use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::headless::{AnalyzerHome, HeadlessOptions};
use crate::project::ProjectStore;

pub const ROOT_ENV: &str = "ARCHSCOPE_HOME";
pub const DEFAULT_PROJECT: &str = "defproj";
const DEFAULT_ROOT_DIR: &str = ".archscope";

/// Values given on the command line; anything left `None` falls back to the
/// environment and then to defaults.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub project_root: Option<PathBuf>,
    pub project: Option<String>,
    pub analyzer_home: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub project_root: PathBuf,
    /// True when the root is the built-in default and may be created on demand.
    pub default_root: bool,
    pub project: String,
    pub analyzer_home: Option<PathBuf>,
    pub headless: HeadlessOptions,
}

impl Settings {
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var_os(key))
    }

    /// Like [`Settings::resolve`] with an injectable environment lookup.
    pub fn resolve_with<F>(overrides: Overrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<std::ffi::OsString>,
    {
        let (project_root, default_root) = match overrides
            .project_root
            .or_else(|| env(ROOT_ENV).map(PathBuf::from))
        {
            Some(root) => (root, false),
            None => {
                let home = dirs::home_dir().context("unable to determine the home directory")?;
                (home.join(DEFAULT_ROOT_DIR), true)
            }
        };

        let settings = Self {
            project_root,
            default_root,
            project: overrides
                .project
                .unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
            analyzer_home: overrides
                .analyzer_home
                .or_else(|| env(crate::headless::HOME_ENV).map(PathBuf::from)),
            headless: HeadlessOptions {
                // A zero timeout means no timeout.
                timeout_secs: overrides.timeout_secs.filter(|secs| *secs > 0),
            },
        };
        log::debug!("resolved settings: {settings:?}");
        Ok(settings)
    }

    /// Opens the project store; only the default root is created if missing.
    pub fn store(&self) -> Result<ProjectStore> {
        let store = if self.default_root {
            ProjectStore::open_or_create(&self.project_root)
        } else {
            ProjectStore::open(&self.project_root)
        };
        store.with_context(|| format!("opening project root {}", self.project_root.display()))
    }

    pub fn analyzer_home(&self) -> Result<AnalyzerHome> {
        Ok(AnalyzerHome::resolve(self.analyzer_home.as_deref())?)
    }
}
