use std::path::{Path, PathBuf};

use crate::{error::Result, item::Item, value::Value};

/// Existence rules for a path item.
///
/// `exists` of `None` accepts both existing and missing paths. The
/// `file_okay`/`dir_okay` flags only apply to paths that exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRules {
    pub exists: Option<bool>,
    pub file_okay: bool,
    pub dir_okay: bool,
}

impl Default for PathRules {
    fn default() -> Self {
        Self {
            exists: None,
            file_okay: true,
            dir_okay: true,
        }
    }
}

impl PathRules {
    pub fn exists(mut self, exists: bool) -> Self {
        self.exists = Some(exists);
        self
    }

    pub fn file_okay(mut self, ok: bool) -> Self {
        self.file_okay = ok;
        self
    }

    pub fn dir_okay(mut self, ok: bool) -> Self {
        self.dir_okay = ok;
        self
    }

    pub(crate) fn validate(&self, item: &Item, value: Value) -> Result<Value> {
        let raw = match &value {
            Value::Str(s) => PathBuf::from(s),
            Value::Path(p) => p.clone(),
            other => return Err(item.error(other, "must be a string or path")),
        };

        let path = std::path::absolute(expand_home(&raw))
            .map_err(|e| item.error(&value, format!("must be a valid path ({e})")))?;

        let exists = path.exists();
        if exists && self.exists == Some(false) {
            return Err(item.error(&value, "must not exist"));
        }
        if !exists && self.exists == Some(true) {
            return Err(item.error(&value, "must exist"));
        }
        if exists {
            if !self.file_okay && path.is_file() {
                return Err(item.error(&value, "must not be a file"));
            }
            if !self.dir_okay && path.is_dir() {
                return Err(item.error(&value, "must not be a directory"));
            }
        }

        Ok(Value::Path(path))
    }
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(rest);
    }
    path.to_path_buf()
}
