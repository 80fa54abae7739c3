//! Resolution of what to dump from a discovered container.
//!
//! Every field is looked up in the same order: an override label on the
//! container, then the container's declared environment, then a fixed
//! default. Resolution never fails.

use crate::container::ContainerDescriptor;

/// Overrides the application name used as the object key prefix.
pub const APP_NAME_LABEL: &str = "postgres-backup/app-name";

/// One resolvable field: override label, environment key and default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub label: &'static str,
    pub env_key: &'static str,
    pub default: &'static str,
}

pub const DATABASE_NAME: FieldRule = FieldRule {
    label: "postgres-backup/db-name",
    env_key: "POSTGRES_DB",
    default: "postgres",
};

pub const DATABASE_USER: FieldRule = FieldRule {
    label: "postgres-backup/db-user",
    env_key: "POSTGRES_USER",
    default: "postgres",
};

const ENV_RULES: [FieldRule; 2] = [DATABASE_NAME, DATABASE_USER];

impl FieldRule {
    /// `env` is `None` when the container could not be inspected.
    pub fn resolve(&self, container: &ContainerDescriptor, env: Option<&[String]>) -> String {
        if let Some(value) = container.label(self.label) {
            return value.to_owned();
        }
        env.and_then(|entries| lookup_env(entries, self.env_key))
            .unwrap_or(self.default)
            .to_owned()
    }
}

/// Walks `KEY=value` entries in declaration order. A malformed entry seen
/// before the key ends the lookup.
fn lookup_env<'a>(entries: &'a [String], key: &str) -> Option<&'a str> {
    for entry in entries {
        let (name, value) = entry.split_once('=')?;
        if name == key {
            return Some(value);
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTarget {
    pub app_name: String,
    pub database: String,
    pub user: String,
}

impl BackupTarget {
    pub fn resolve(container: &ContainerDescriptor, env: Option<&[String]>) -> Self {
        Self {
            app_name: app_name(container),
            database: DATABASE_NAME.resolve(container, env),
            user: DATABASE_USER.resolve(container, env),
        }
    }

    /// Whether any field would fall through to the container environment.
    pub fn needs_environment(container: &ContainerDescriptor) -> bool {
        ENV_RULES
            .iter()
            .any(|rule| container.label(rule.label).is_none())
    }
}

/// Override label, then the first container name, then the short id.
pub fn app_name(container: &ContainerDescriptor) -> String {
    if let Some(value) = container.label(APP_NAME_LABEL) {
        return value.to_owned();
    }
    match container.names.first() {
        Some(name) => name.trim_start_matches('/').to_owned(),
        None => container.short_id().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn app_name_falls_back_to_short_id() {
        let container = ContainerDescriptor::new("abcdef0123456789");
        assert_eq!(app_name(&container), "abcdef012345");
    }

    #[test]
    fn app_name_prefers_label_over_names() {
        let container = ContainerDescriptor::new("abcdef0123456789")
            .with_name("/shop-db")
            .with_label(APP_NAME_LABEL, "shop");
        assert_eq!(app_name(&container), "shop");
    }

    #[test]
    fn app_name_uses_first_name_without_leading_slash() {
        let container = ContainerDescriptor::new("abcdef0123456789")
            .with_name("/shop-db")
            .with_name("/other");
        assert_eq!(app_name(&container), "shop-db");
    }

    #[test]
    fn database_fields_prefer_labels() {
        let container = ContainerDescriptor::new("abcdef0123456789")
            .with_label(DATABASE_NAME.label, "orders")
            .with_label(DATABASE_USER.label, "admin");
        let entries = env(&["POSTGRES_DB=ignored", "POSTGRES_USER=ignored"]);
        let target = BackupTarget::resolve(&container, Some(&entries));
        assert_eq!(target.database, "orders");
        assert_eq!(target.user, "admin");
        assert!(!BackupTarget::needs_environment(&container));
    }

    #[test]
    fn database_fields_fall_back_to_environment() {
        let container = ContainerDescriptor::new("abcdef0123456789");
        let entries = env(&["PATH=/usr/bin", "POSTGRES_USER=shop", "POSTGRES_DB=shop_prod"]);
        let target = BackupTarget::resolve(&container, Some(&entries));
        assert_eq!(target.database, "shop_prod");
        assert_eq!(target.user, "shop");
        assert!(BackupTarget::needs_environment(&container));
    }

    #[test]
    fn values_may_contain_equals_signs() {
        let container = ContainerDescriptor::new("abcdef0123456789");
        let entries = env(&["POSTGRES_DB=a=b"]);
        assert_eq!(DATABASE_NAME.resolve(&container, Some(&entries)), "a=b");
    }

    #[test]
    fn malformed_entry_yields_default() {
        let container = ContainerDescriptor::new("abcdef0123456789");
        let entries = env(&["GARBAGE", "POSTGRES_DB=shop"]);
        assert_eq!(DATABASE_NAME.resolve(&container, Some(&entries)), "postgres");
    }

    #[test]
    fn failed_inspection_yields_defaults() {
        let container = ContainerDescriptor::new("abcdef0123456789");
        let target = BackupTarget::resolve(&container, None);
        assert_eq!(
            target,
            BackupTarget {
                app_name: "abcdef012345".to_owned(),
                database: "postgres".to_owned(),
                user: "postgres".to_owned(),
            }
        );
    }
}
