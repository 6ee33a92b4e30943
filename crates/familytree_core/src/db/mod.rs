//! SQLite bootstrap for the snapshot store.
//!
//! Connections handed out here are migrated to
//! [`migrations::latest_version`]. A store file touched by a newer build is
//! refused rather than downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

/// Failure opening or migrating the snapshot store.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// `PRAGMA user_version` is ahead of every migration this build knows.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "snapshot store: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "snapshot store was written by a newer build \
                 (schema {db_version}, this build reads up to {latest_supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        if let Self::Sqlite(err) = self {
            Some(err)
        } else {
            None
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

#[cfg(test)]
mod tests {
    use super::DbError;
    use std::error::Error;

    #[test]
    fn newer_schema_message_names_both_versions() {
        let err = DbError::UnsupportedSchemaVersion {
            db_version: 7,
            latest_supported: 1,
        };
        let message = err.to_string();
        assert!(message.contains("schema 7"));
        assert!(message.contains("up to 1"));
        assert!(err.source().is_none());
    }

    #[test]
    fn sqlite_errors_keep_their_source() {
        let err = DbError::from(rusqlite::Error::InvalidQuery);
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("snapshot store:"));
    }
}
