use crate::header::BinaryFormat;
use crate::image::{file_name, ImageError, ProgramImage};
use crate::language::{LanguageDescription, LanguageParseError};
use crate::properties::{
    Properties, KEY_FORMAT, KEY_LANGUAGE, KEY_NAME, KEY_PATH, KEY_SOURCE, PROPERTY_EXTENSION,
    SOURCE_STORE,
};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("invalid project name \"{0}\"")]
    InvalidName(String),
    #[error("project {0} exists")]
    AlreadyExists(String),
    #[error("project \"{0}\" does not exist")]
    NotFound(String),
    #[error("project root {0} does not exist")]
    MissingRoot(String),
    #[error("file {0} does not exist")]
    FileNotFound(String),
    #[error("file {0} was already analyzed")]
    AlreadyImported(String),
    #[error("no program named \"{name}\" in project \"{project}\"")]
    ProgramNotFound { project: String, name: String },
    #[error("{path}: {message}")]
    BadProperties { path: String, message: String },
    #[error(transparent)]
    Language(#[from] LanguageParseError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ProjectError>;

/// A project together with the programs recorded in it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProjectEntry {
    pub project: String,
    pub files: Vec<String>,
}

/// Folder of projects; each project is a direct subdirectory of `root`.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    /// Opens an existing project root.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ProjectError::MissingRoot(root.display().to_string()));
        }
        let root = root.canonicalize()?;
        log::debug!("project store opened at {}", root.display());
        Ok(Self { root })
    }

    /// Opens `root`, creating it first if needed.
    pub fn open_or_create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            log::info!("creating project root {}", root.display());
            fs::create_dir_all(root)?;
        }
        Self::open(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder holding project `name`. The name must be a single plain path
    /// component so the folder stays directly under the root.
    pub fn project_dir(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == name => Ok(self.root.join(name)),
            _ => Err(ProjectError::InvalidName(name.to_string())),
        }
    }

    pub fn project_exists(&self, name: &str) -> Result<bool> {
        Ok(self.project_dir(name)?.is_dir())
    }

    pub fn create_project(&self, name: &str) -> Result<()> {
        let dir = self.project_dir(name)?;
        if dir.exists() {
            return Err(ProjectError::AlreadyExists(dir.display().to_string()));
        }
        fs::create_dir(&dir)?;
        log::info!("created project {name}");
        Ok(())
    }

    /// Removes project `name` with everything in it. Missing projects are
    /// left alone.
    pub fn delete_project(&self, name: &str) -> Result<()> {
        let dir = self.project_dir(name)?;
        if !dir.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&dir)?;
        log::info!("deleted project {name}");
        Ok(())
    }

    pub fn list_projects(&self) -> Result<Vec<String>> {
        let mut projects = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                projects.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        projects.sort();
        Ok(projects)
    }

    /// Names of all programs in project `name`, gathered from every property
    /// file below the project folder.
    pub fn list_files(&self, name: &str) -> Result<Vec<String>> {
        let mut files: Vec<String> = Vec::new();
        for (_, props) in self.entries(name)? {
            if let Some(file) = props.get(KEY_NAME) {
                if !files.iter().any(|f| f == file) {
                    files.push(file.to_string());
                }
            }
        }
        Ok(files)
    }

    pub fn list(&self) -> Result<Vec<ProjectEntry>> {
        self.list_projects()?
            .into_iter()
            .map(|project| {
                let files = self.list_files(&project)?;
                Ok(ProjectEntry { project, files })
            })
            .collect()
    }

    pub fn contains_file(&self, project: &str, name: &str) -> Result<bool> {
        Ok(self.list_files(project)?.iter().any(|f| f == name))
    }

    /// True when the headless analyzer has its own entry for `name`.
    /// Entries recorded by [`ProjectStore::import`] do not count.
    pub fn contains_analyzed_file(&self, project: &str, name: &str) -> Result<bool> {
        Ok(self
            .entries(project)?
            .iter()
            .any(|(_, props)| !props.is_store_entry() && props.get(KEY_NAME) == Some(name)))
    }

    /// True when [`ProjectStore::import`] already recorded `name`.
    pub fn contains_imported_file(&self, project: &str, name: &str) -> Result<bool> {
        Ok(self
            .entries(project)?
            .iter()
            .any(|(_, props)| props.is_store_entry() && props.get(KEY_NAME) == Some(name)))
    }

    /// Loads the binary at `path` and records it in `project`.
    pub fn import<P: AsRef<Path>>(&self, project: &str, path: P) -> Result<ProgramImage> {
        let dir = self.existing_project(project)?;
        let path = path.as_ref();
        if !path.exists() {
            return Err(ProjectError::FileNotFound(path.display().to_string()));
        }
        let path = path.canonicalize()?;

        let name = file_name(&path);
        if self.contains_imported_file(project, &name)? {
            return Err(ProjectError::AlreadyImported(path.display().to_string()));
        }

        let image = ProgramImage::open(&path)?;

        let mut props = Properties::new();
        props
            .set(KEY_NAME, image.name.as_str())
            .set(KEY_SOURCE, SOURCE_STORE)
            .set(KEY_FORMAT, image.format.to_string())
            .set(KEY_PATH, image.path.display().to_string());
        if let Ok(language) = image.language_description() {
            props.set(KEY_LANGUAGE, language.to_string());
        }

        let prp = dir.join(format!("{name}.{PROPERTY_EXTENSION}"));
        fs::write(&prp, props.to_xml())?;
        log::info!("imported {} into {project}", image.name);
        Ok(image)
    }

    /// Rebuilds the image recorded as `name` in `project`.
    ///
    /// The store's own entry wins over one written by the analyzer. Entries
    /// without a `LANGUAGE` property come back not fully loaded.
    pub fn load(&self, project: &str, name: &str) -> Result<ProgramImage> {
        let mut matching: Vec<(PathBuf, Properties)> = self
            .entries(project)?
            .into_iter()
            .filter(|(_, props)| props.get(KEY_NAME) == Some(name))
            .collect();
        matching.sort_by_key(|(_, props)| !props.is_store_entry());

        let Some((path, props)) = matching.into_iter().next() else {
            return Err(ProjectError::ProgramNotFound {
                project: project.to_string(),
                name: name.to_string(),
            });
        };
        log::debug!("{name} found in {}", path.display());

        let format = props
            .get(KEY_FORMAT)
            .unwrap_or("ELF")
            .parse::<BinaryFormat>()
            .map_err(|message| ProjectError::BadProperties {
                path: path.display().to_string(),
                message,
            })?;
        let language = props
            .get(KEY_LANGUAGE)
            .map(str::parse::<LanguageDescription>)
            .transpose()?;
        if language.is_none() {
            log::warn!("{name} has no recorded language");
        }
        let image_path = props.get(KEY_PATH).map(PathBuf::from).unwrap_or_default();
        Ok(ProgramImage::new(name, image_path, format, language))
    }

    /// Every property file of project `name` with its parsed entries.
    fn entries(&self, name: &str) -> Result<Vec<(PathBuf, Properties)>> {
        let dir = self.existing_project(name)?;
        Self::property_files(&dir)
            .into_iter()
            .map(|path| {
                let props = Properties::parse(&fs::read_to_string(&path)?);
                Ok((path, props))
            })
            .collect()
    }

    fn existing_project(&self, name: &str) -> Result<PathBuf> {
        let dir = self.project_dir(name)?;
        if !dir.is_dir() {
            return Err(ProjectError::NotFound(name.to_string()));
        }
        Ok(dir)
    }

    fn property_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == PROPERTY_EXTENSION))
            .collect();
        files.sort();
        files
    }
}
