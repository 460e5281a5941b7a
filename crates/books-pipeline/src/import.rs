//! Bulk catalog import.
//!
//! The whole import is one session: in replace mode the delete and the
//! inserts commit together, so readers see either the old catalog or the
//! new one, never a mix or an empty table.

use std::fmt;
use std::str::FromStr;

use books_domain::Book;
use books_persistence::{Database, RetryPolicy, queries};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Leave an already-populated catalog untouched
    SkipIfPopulated,
    /// Delete every book and insert the file's contents
    #[default]
    Replace,
}

impl ImportMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SkipIfPopulated => "skip_if_populated",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "skip_if_populated" => Ok(Self::SkipIfPopulated),
            "replace" => Ok(Self::Replace),
            other => Err(format!(
                "unknown import mode '{other}' (expected replace or skip_if_populated)"
            )),
        }
    }
}

/// What an import did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub mode: ImportMode,
    /// Books present before the import
    pub existing: i64,
    pub deleted: u64,
    pub inserted: u64,
    /// The catalog was populated and `SkipIfPopulated` left it alone
    pub skipped: bool,
}

/// Load `books` into the catalog according to `mode`, retrying the whole
/// transaction on lock contention.
pub async fn import_books(
    db: &Database,
    retry: RetryPolicy,
    books: &[Book],
    mode: ImportMode,
) -> Result<ImportReport> {
    let report = retry
        .run("import_books", move || async move {
            let mut session = db.acquire_session().await?;
            let result: books_persistence::Result<ImportReport> = async {
                let existing = queries::books::count(&mut session).await?;
                if mode == ImportMode::SkipIfPopulated && existing > 0 {
                    return Ok(ImportReport {
                        mode,
                        existing,
                        deleted: 0,
                        inserted: 0,
                        skipped: true,
                    });
                }

                let deleted = queries::books::delete_all(&mut session).await?;
                let inserted = queries::books::insert_batch(&mut session, books).await?;
                Ok(ImportReport {
                    mode,
                    existing,
                    deleted,
                    inserted,
                    skipped: false,
                })
            }
            .await;
            session.finish(result).await
        })
        .await?;

    if report.skipped {
        tracing::info!(existing = report.existing, "Catalog already populated, import skipped");
    } else {
        tracing::info!(
            mode = %report.mode,
            deleted = report.deleted,
            inserted = report.inserted,
            "Catalog imported"
        );
    }
    Ok(report)
}
