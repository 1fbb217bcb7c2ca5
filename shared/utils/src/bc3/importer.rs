//! Import Orchestrator
//!
//! Detects the dialect of a document, runs the matching parser, then the
//! assembler. An import either yields one finished [`ImportResult`] or a
//! terminal [`ImportError`]; nothing partial escapes.

use std::path::Path;
use tokio::task::JoinError;
use tracing::Instrument as _;
use uuid::Uuid;

use ofitec_models::{Dialect, ImportResult};

use super::assembler::assemble;
use super::detector::{decode, decode_utf8_lossy, detect_within, DEFAULT_DETECTION_WINDOW};
use super::extended::parse_extended;
use super::simple::parse_simple;
use super::ParsedDocument;
use crate::config::ImportConfig;
use crate::error::{ImportError, ImportOutcome};

#[derive(Debug, Clone)]
pub struct BudgetImporter {
    detection_window: usize,
}

impl Default for BudgetImporter {
    fn default() -> Self {
        Self {
            detection_window: DEFAULT_DETECTION_WINDOW,
        }
    }
}

impl BudgetImporter {
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            detection_window: config.detection_window,
        }
    }

    /// Choose the grammar for a raw document.
    pub fn detect(&self, bytes: &[u8]) -> Dialect {
        detect_within(&decode_utf8_lossy(bytes), self.detection_window)
    }

    /// Read and import a document from disk. The file is read in full and
    /// closed before parsing starts.
    pub fn import_file(&self, path: impl AsRef<Path>) -> Result<ImportResult, ImportError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ImportError::io(path.display().to_string(), &e))?;
        let source_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.import_bytes(&source_name, &bytes)
    }

    /// Import an in-memory document.
    pub fn import_bytes(&self, source_name: &str, bytes: &[u8]) -> Result<ImportResult, ImportError> {
        let span = tracing::info_span!("bc3_import", import_id = %Uuid::new_v4(), source = %source_name);
        let _entered = span.enter();

        let dialect = self.detect(bytes);
        tracing::info!(%dialect, encoding = dialect.encoding(), bytes = bytes.len(), "Dialect detected");

        let text = decode(bytes, dialect);
        let parsed = match dialect {
            Dialect::Simple => ParsedDocument::Simple(parse_simple(&text).map_err(|e| {
                tracing::error!(error = %e, "Simple-dialect parse failed");
                e
            })?),
            Dialect::Extended => ParsedDocument::Extended(parse_extended(&text)),
        };

        assemble(parsed, source_name).map_err(|e| {
            tracing::error!(error = %e, code = e.error_code(), "Import failed");
            e
        })
    }

    /// [`Self::import_file`] as a tagged outcome.
    pub fn import_outcome(&self, path: impl AsRef<Path>) -> ImportOutcome {
        ImportOutcome::from(self.import_file(path))
    }

    /// Import on the blocking pool so async callers can run several
    /// documents side by side.
    pub async fn import_file_async(&self, path: impl AsRef<Path>) -> Result<ImportResult, ImportError> {
        let importer = self.clone();
        let path = path.as_ref().to_path_buf();
        let display = path.display().to_string();
        let joined = tokio::task::spawn_blocking(move || importer.import_file(path))
            .in_current_span()
            .await;
        rejoin(joined, display)
    }
}

/// Unwrap a finished blocking import. A panic in the worker is re-raised
/// on the caller; only cancellation becomes an [`ImportError`].
fn rejoin(joined: Result<Result<ImportResult, ImportError>, JoinError>, path: String) -> Result<ImportResult, ImportError> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => {
            tracing::warn!(%path, "Blocking import task was cancelled");
            Err(ImportError::Cancelled { path })
        }
    }
}
