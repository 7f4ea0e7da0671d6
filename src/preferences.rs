use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::column::ColumnDescriptor;
use crate::domain::GridError;

/// Persistence for per-view column layouts.
///
/// Saving `None` clears the override so the view falls back to its
/// configured columns.
pub trait PreferenceStore {
    fn save(&mut self, key: &str, columns: Option<&[ColumnDescriptor]>) -> Result<(), GridError>;

    fn load(&self, key: &str) -> Result<Option<Vec<ColumnDescriptor>>, GridError>;
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for Box<T> {
    fn save(&mut self, key: &str, columns: Option<&[ColumnDescriptor]>) -> Result<(), GridError> {
        (**self).save(key, columns)
    }

    fn load(&self, key: &str) -> Result<Option<Vec<ColumnDescriptor>>, GridError> {
        (**self).load(key)
    }
}

type SaveCall = (String, Option<Vec<ColumnDescriptor>>);

/// Keeps layouts in memory and remembers every save call in order.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    saved: HashMap<String, Vec<ColumnDescriptor>>,
    history: Vec<SaveCall>,
}

impl MemoryPreferenceStore {
    pub fn history(&self) -> &[SaveCall] {
        &self.history
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn save(&mut self, key: &str, columns: Option<&[ColumnDescriptor]>) -> Result<(), GridError> {
        match columns {
            Some(columns) => {
                self.saved.insert(key.to_string(), columns.to_vec());
            }
            None => {
                self.saved.remove(key);
            }
        }
        self.history
            .push((key.to_string(), columns.map(<[ColumnDescriptor]>::to_vec)));
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<ColumnDescriptor>>, GridError> {
        Ok(self.saved.get(key).cloned())
    }
}

/// One pretty-printed JSON file per preference key inside a directory.
#[derive(Debug)]
pub struct JsonFilePreferenceStore {
    dir: PathBuf,
}

impl JsonFilePreferenceStore {
    /// `dir` may use `~` and environment variables. The directory is created
    /// if it does not exist.
    pub fn new(dir: &str) -> Result<Self, GridError> {
        let expanded = shellexpand::full(dir)
            .map_err(|e| GridError::Config(format!("cannot expand '{dir}': {e}")))?;
        let dir = PathBuf::from(expanded.as_ref());
        fs::create_dir_all(&dir)?;
        debug!("Using preference directory {}", dir.display());
        Ok(JsonFilePreferenceStore { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn save(&mut self, key: &str, columns: Option<&[ColumnDescriptor]>) -> Result<(), GridError> {
        let path = self.path_for(key);
        match columns {
            Some(columns) => {
                let content = serde_json::to_string_pretty(columns)?;
                fs::write(&path, content)?;
                trace!("Wrote {}", path.display());
            }
            None => match fs::remove_file(&path) {
                Ok(()) => trace!("Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<ColumnDescriptor>>, GridError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
