//! Raw package contents

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::Error;

/// Package files keyed by `/`-separated path relative to the package root
pub type Files = BTreeMap<String, Vec<u8>>;

/// Read a package folder into [`Files`]
///
/// Hidden files and directories (leading `.`) are skipped.
pub fn import_folder(root: impl AsRef<Path>) -> Result<Files, Error> {
    let root = root.as_ref();
    let mut files = Files::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry.map_err(|e| {
            Error::internal(format!("importing package folder {}", root.display()), e.to_string())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).map_err(|e| {
            Error::internal("importing package folder", e.to_string())
        })?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let content = std::fs::read(entry.path()).map_err(|e| {
            Error::internal(format!("reading package file {}", key), e.to_string())
        })?;
        files.insert(key, content);
    }

    debug!(root = %root.display(), count = files.len(), "imported package folder");
    Ok(files)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
