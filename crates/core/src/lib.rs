pub mod archive;
pub mod container;
pub mod hash;
pub mod key;
pub mod target;

pub use archive::{decode_archive, ArchiveError, ArchiveFileMap};
pub use container::{ContainerDescriptor, BACKUP_LABEL, BACKUP_SELECTOR};
pub use hash::content_hash;
pub use key::{object_key, DUMP_FILE_NAME, DUMP_PATH};
pub use target::{BackupTarget, FieldRule, APP_NAME_LABEL, DATABASE_NAME, DATABASE_USER};
