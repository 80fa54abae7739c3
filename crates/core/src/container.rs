use std::collections::HashMap;

/// Label that opts a container into backups.
pub const BACKUP_LABEL: &str = "postgres-backup";

/// Label selector handed to the container runtime when listing candidates.
pub const BACKUP_SELECTOR: &str = "postgres-backup=true";

const SHORT_ID_LEN: usize = 12;

/// Snapshot of a discovered container, taken once per scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerDescriptor {
    pub id: String,
    pub labels: HashMap<String, String>,
    pub names: Vec<String>,
}

impl ContainerDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// First 12 characters of the id, the form `docker ps` prints.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}
