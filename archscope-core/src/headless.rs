use crate::image::file_name;
use crate::project::{ProjectError, ProjectStore};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

pub const HOME_ENV: &str = "GHIDRA_HOME";

#[derive(Debug, thiserror::Error)]
pub enum HeadlessError {
    #[error("GHIDRA_HOME environment variable not set")]
    HomeNotSet,
    #[error("analyzer home folder {0} is not correct")]
    BadHome(String),
    #[error("unable to find analyzeHeadless under {0}")]
    LauncherMissing(String),
    #[error("script \"{0}\" does not exist")]
    ScriptNotFound(String),
    #[error("failed to launch {launcher}: {source}")]
    Spawn { launcher: String, source: io::Error },
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Installation folder of the headless analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerHome {
    pub home: PathBuf,
    pub launcher: PathBuf,
}

impl AnalyzerHome {
    /// Uses `explicit` when given, otherwise `$GHIDRA_HOME`.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let home = match explicit {
            Some(home) => home.to_path_buf(),
            None => std::env::var_os(HOME_ENV)
                .map(PathBuf::from)
                .ok_or(HeadlessError::HomeNotSet)?,
        };
        Self::at(&home)
    }

    pub fn at(home: &Path) -> Result<Self> {
        let home = home
            .canonicalize()
            .map_err(|_| HeadlessError::BadHome(home.display().to_string()))?;
        if !home.is_dir() {
            return Err(HeadlessError::BadHome(home.display().to_string()));
        }

        let launcher = home.join("support").join("analyzeHeadless");
        if !launcher.is_file() {
            return Err(HeadlessError::LauncherMissing(home.display().to_string()));
        }

        log::debug!("analyzer home {}, launcher {}", home.display(), launcher.display());
        Ok(Self { home, launcher })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessOptions {
    /// Per-file analysis timeout in seconds.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct HeadlessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Drives the headless analyzer against projects in a [`ProjectStore`].
#[derive(Debug, Clone)]
pub struct HeadlessRunner {
    home: AnalyzerHome,
    options: HeadlessOptions,
}

impl HeadlessRunner {
    pub fn new(home: AnalyzerHome, options: HeadlessOptions) -> Self {
        Self { home, options }
    }

    pub fn home(&self) -> &AnalyzerHome {
        &self.home
    }

    pub fn import_args(&self, project_dir: &Path, project: &str, binary: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            project_dir.into(),
            project.into(),
            "-import".into(),
            binary.into(),
        ];
        self.push_timeout(&mut args);
        args
    }

    pub fn script_args(
        &self,
        project_dir: &Path,
        project: &str,
        program: &str,
        script: &Path,
        script_args: &[String],
    ) -> Vec<OsString> {
        let script_dir = script.parent().unwrap_or_else(|| Path::new("."));
        let mut args: Vec<OsString> = vec![
            project_dir.into(),
            project.into(),
            "-noanalysis".into(),
            "-process".into(),
            program.into(),
            "-scriptPath".into(),
            script_dir.into(),
        ];
        self.push_timeout(&mut args);
        args.push("-postScript".into());
        args.push(file_name(script).into());
        args.extend(script_args.iter().map(OsString::from));
        args
    }

    fn push_timeout(&self, args: &mut Vec<OsString>) {
        if let Some(secs) = self.options.timeout_secs {
            args.push("-analysisTimeoutPerFile".into());
            args.push(secs.to_string().into());
        }
    }

    /// Imports and analyzes `binary` into `project`. Entries recorded by
    /// [`ProjectStore::import`] do not count as analyzed.
    pub fn analyze_file(
        &self,
        store: &ProjectStore,
        project: &str,
        binary: &Path,
    ) -> Result<HeadlessOutput> {
        if !store.project_exists(project)? {
            return Err(ProjectError::NotFound(project.to_string()).into());
        }
        if !binary.exists() {
            return Err(ProjectError::FileNotFound(binary.display().to_string()).into());
        }
        let binary = binary.canonicalize()?;
        if store.contains_analyzed_file(project, &file_name(&binary))? {
            return Err(ProjectError::AlreadyImported(binary.display().to_string()).into());
        }

        let project_dir = store.project_dir(project)?;
        self.run(self.import_args(&project_dir, project, &binary))
    }

    /// Runs `script` over `binary` in `project`, importing the binary into
    /// the analyzer first when it has no analyzer entry yet.
    pub fn run_script(
        &self,
        store: &ProjectStore,
        project: &str,
        binary: &Path,
        script: &Path,
        script_args: &[String],
    ) -> Result<HeadlessOutput> {
        let script = script
            .canonicalize()
            .map_err(|_| HeadlessError::ScriptNotFound(script.display().to_string()))?;

        if !store.project_exists(project)? {
            store.create_project(project)?;
        }

        let program = file_name(binary);
        if !store.contains_analyzed_file(project, &program)? {
            self.analyze_file(store, project, binary)?;
        }

        let project_dir = store.project_dir(project)?;
        self.run(self.script_args(&project_dir, project, &program, &script, script_args))
    }

    fn run(&self, args: Vec<OsString>) -> Result<HeadlessOutput> {
        let launcher = &self.home.launcher;
        log::debug!("running {} {:?}", launcher.display(), args);

        let output = Command::new(launcher)
            .args(&args)
            .output()
            .map_err(|source| HeadlessError::Spawn {
                launcher: launcher.display().to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        for line in stdout.lines() {
            log::debug!("analyzer [stdout] - {line}");
        }
        for line in stderr.lines() {
            log::warn!("analyzer [stderr] - {line}");
        }
        if !output.status.success() {
            log::warn!("analyzer exited with {}", output.status);
        }

        Ok(HeadlessOutput {
            status: output.status,
            stdout,
            stderr,
        })
    }
}
