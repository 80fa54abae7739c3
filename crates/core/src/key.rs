use chrono::{DateTime, SecondsFormat, Utc};

/// Where the dump command writes inside the container.
pub const DUMP_PATH: &str = "/tmp/dump.sql";

/// Name of the dump entry in the archive returned by a copy-out of [`DUMP_PATH`].
pub const DUMP_FILE_NAME: &str = "dump.sql";

/// `{app}/{RFC3339 timestamp}.sql`, second precision.
pub fn object_key(app_name: &str, at: DateTime<Utc>) -> String {
    format!(
        "{app_name}/{}.sql",
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}
