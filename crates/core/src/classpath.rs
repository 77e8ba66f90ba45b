//! Resource search paths: directories and jar archives.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

/// Largest entry a jar may declare. Class files are far smaller; anything
/// bigger is a damaged or forged directory.
const MAX_ENTRY_SIZE: u64 = 1 << 30;

/// Upper bound on the buffer reserved from a declared size.
const MAX_PREALLOC: u64 = 1 << 20;

#[derive(Debug, Error)]
pub enum JarError {
    #[error("jar path must not be empty")]
    EmptyPath,
    #[error("Failed to open jar {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is not a readable jar archive")]
    Archive {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
}

/// An opened jar. Clones share the underlying archive handle.
#[derive(Clone)]
pub struct ResourceJar {
    path: PathBuf,
    archive: Arc<Mutex<ZipArchive<File>>>,
}

impl fmt::Debug for ResourceJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceJar").field("path", &self.path).finish()
    }
}

impl ResourceJar {
    /// Open `path` and read its central directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JarError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(JarError::EmptyPath);
        }
        let file = File::open(path)
            .map_err(|source| JarError::Open { path: path.to_path_buf(), source })?;
        let archive = ZipArchive::new(file)
            .map_err(|source| JarError::Archive { path: path.to_path_buf(), source })?;
        Ok(Self { path: path.to_path_buf(), archive: Arc::new(Mutex::new(archive)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read one entry. A missing entry is `Ok(None)`; a damaged archive or
    /// entry is an I/O error.
    pub fn read_entry(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let mut archive = self.archive.lock();
        let mut entry = match archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(ZipError::Io(err)) => return Err(err),
            Err(other) => return Err(io::Error::new(io::ErrorKind::InvalidData, other)),
        };
        let declared = entry.size();
        if declared > MAX_ENTRY_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("jar entry {name} declares {declared} bytes"),
            ));
        }
        let mut data = Vec::with_capacity(declared.min(MAX_PREALLOC) as usize);
        entry.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.archive.lock().file_names().any(|entry| entry == name)
    }

    /// Entry names, sorted.
    pub fn entry_names(&self) -> Vec<String> {
        let archive = self.archive.lock();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }
}

/// One element of a search path.
#[derive(Debug, Clone)]
pub enum ClassPathEntry {
    Directory(PathBuf),
    Jar(ResourceJar),
}

impl ClassPathEntry {
    /// Directories are taken as-is; anything else is opened as a jar.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JarError> {
        let path = path.as_ref();
        if path.is_dir() {
            Ok(ClassPathEntry::Directory(path.to_path_buf()))
        } else {
            Ok(ClassPathEntry::Jar(ResourceJar::open(path)?))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ClassPathEntry::Directory(path) => path,
            ClassPathEntry::Jar(jar) => jar.path(),
        }
    }

    pub fn read(&self, resource: &str) -> io::Result<Option<Vec<u8>>> {
        match self {
            ClassPathEntry::Jar(jar) => jar.read_entry(resource),
            ClassPathEntry::Directory(root) => {
                let relative = Path::new(resource);
                if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
                    return Ok(None);
                }
                let candidate = root.join(relative);
                if !candidate.is_file() {
                    return Ok(None);
                }
                fs::read(&candidate).map(Some)
            }
        }
    }
}

/// Ordered search path; the first entry holding a resource wins.
#[derive(Debug, Clone, Default)]
pub struct ClassPath {
    entries: Vec<ClassPathEntry>,
}

impl ClassPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<ClassPathEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: ClassPathEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ClassPathEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, resource: &str) -> io::Result<Option<Vec<u8>>> {
        for entry in &self.entries {
            if let Some(data) = entry.read(resource)? {
                return Ok(Some(data));
            }
        }
        Ok(None)
    }
}
