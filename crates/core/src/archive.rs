use std::collections::BTreeMap;
use std::io::Read;

use thiserror::Error;

/// Archive-relative path (leading `/` stripped) to file contents.
pub type ArchiveFileMap = BTreeMap<String, Vec<u8>>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("reading archive entries")]
    Entries(#[source] std::io::Error),
    #[error("reading archive entry {path:?}")]
    Entry {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Decodes a tar stream fully into memory, keeping regular files only.
pub fn decode_archive<R: Read>(reader: R) -> Result<ArchiveFileMap, ArchiveError> {
    let mut archive = tar::Archive::new(reader);
    let mut files = ArchiveFileMap::new();

    for entry in archive.entries().map_err(ArchiveError::Entries)? {
        let mut entry = entry.map_err(ArchiveError::Entries)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = String::from_utf8_lossy(&entry.path_bytes())
            .trim_start_matches('/')
            .to_owned();
        // The declared size is untrusted; let the buffer grow with the data.
        let mut contents = Vec::new();
        if let Err(source) = entry.read_to_end(&mut contents) {
            return Err(ArchiveError::Entry { path, source });
        }
        files.insert(path, contents);
    }

    Ok(files)
}
