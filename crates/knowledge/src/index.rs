//! SQLite-backed local document index.
//!
//! Stores whole documents and scores them lexically at query time: a
//! document's score is the fraction of distinct query terms it contains, so
//! scores fall in `[0, 1]` and are directly comparable with `minScore`.

use crate::search::SearchClient;
use crate::types::{IngestStats, RetrievedDocument};
use chrono::Utc;
use kbchat_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use walkdir::WalkDir;

/// File extensions ingested by [`LocalIndex::add_path`].
const SUPPORTED_EXTENSIONS: [&str; 4] = ["md", "markdown", "txt", "rst"];

/// Words too common to say anything about relevance.
const STOP_WORDS: [&str; 40] = [
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "how", "who", "when", "where", "why", "does",
    "can",
];

/// Local document index.
///
/// Clones share one connection.
#[derive(Clone)]
pub struct LocalIndex {
    conn: Arc<Mutex<Connection>>,
}

impl LocalIndex {
    /// Open (or create) the index database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

        tracing::debug!("Opened local index at {:?}", db_path);
        Self::init(conn)
    }

    /// Open a throwaway in-memory index.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                title TEXT,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL,
                added_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("Local index lock poisoned".to_string()))
    }

    /// Insert a document and return its id.
    pub fn add_document(
        &self,
        title: Option<&str>,
        content: &str,
        metadata: &serde_json::Value,
    ) -> AppResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let metadata_json = serde_json::to_string(metadata)?;

        self.lock()?
            .execute(
                "INSERT INTO documents (id, title, content, metadata, added_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, title, content, metadata_json, Utc::now().to_rfc3339()],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to insert document: {}", e)))?;

        Ok(id)
    }

    /// Ingest a file, or every supported file below a directory.
    ///
    /// Each file becomes one document titled by its file name.
    pub fn add_path(&self, path: &Path) -> AppResult<IngestStats> {
        if !path.exists() {
            return Err(AppError::Knowledge(format!("Path does not exist: {:?}", path)));
        }

        let mut stats = IngestStats::default();

        for entry in WalkDir::new(path)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let file_path = entry.path();
            let supported = file_path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false);

            if !supported {
                stats.files_skipped += 1;
                continue;
            }

            let content = match std::fs::read_to_string(file_path) {
                Ok(content) if !content.trim().is_empty() => content,
                Ok(_) => {
                    stats.files_skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable file {:?}: {}", file_path, e);
                    stats.files_skipped += 1;
                    continue;
                }
            };

            let title = file_path
                .file_name()
                .map(|name| name.to_string_lossy().to_string());
            let metadata = serde_json::json!({ "source_path": file_path.to_string_lossy() });

            self.add_document(title.as_deref(), &content, &metadata)?;
            stats.documents_added += 1;
        }

        tracing::info!(
            "Ingested {} documents ({} files skipped) from {:?}",
            stats.documents_added,
            stats.files_skipped,
            path
        );

        Ok(stats)
    }

    /// Number of stored documents.
    pub fn count(&self) -> AppResult<u32> {
        let count = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get::<_, i64>(0))
            .map_err(|e| AppError::Knowledge(format!("Failed to count documents: {}", e)))?;

        u32::try_from(count)
            .map_err(|_| AppError::Knowledge(format!("Document count out of range: {}", count)))
    }

    /// Delete every stored document.
    pub fn reset(&self) -> AppResult<()> {
        self.lock()?
            .execute("DELETE FROM documents", [])
            .map_err(|e| AppError::Knowledge(format!("Failed to delete documents: {}", e)))?;

        tracing::info!("Reset local index");
        Ok(())
    }

    /// Score every document against `query` and return the best matches.
    pub fn query(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
    ) -> AppResult<Vec<RetrievedDocument>> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT title, content, metadata FROM documents ORDER BY added_at, rowid")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query documents: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            let (title, content, metadata_json) =
                row.map_err(|e| AppError::Knowledge(format!("Failed to read document: {}", e)))?;

            let score = term_overlap(&query_terms, title.as_deref(), &content);
            if score < min_score {
                continue;
            }

            let metadata: serde_json::Value = serde_json::from_str(&metadata_json)?;
            let mut doc = RetrievedDocument::new(content, score).with_metadata(metadata);
            doc.title = title;
            results.push(doc);
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        tracing::debug!(
            "Local index matched {} documents (requested top-{})",
            results.len(),
            top_k
        );

        Ok(results)
    }
}

#[async_trait::async_trait]
impl SearchClient for LocalIndex {
    fn backend_name(&self) -> &str {
        "local"
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
    ) -> AppResult<Vec<RetrievedDocument>> {
        // The scan reads every row, so keep it off the async workers.
        let index = self.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || index.query(&query, top_k, min_score))
            .await
            .map_err(|e| AppError::Search(format!("Local search task failed: {}", e)))?
            .map_err(|e| AppError::Search(e.to_string()))
    }
}

/// Lowercased, de-duplicated content words of `text`.
fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|word| word.chars().count() > 2 && !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

/// Fraction of query terms present in the document title or content.
fn term_overlap(query_terms: &HashSet<String>, title: Option<&str>, content: &str) -> f32 {
    let mut doc_terms = terms(content);
    if let Some(title) = title {
        doc_terms.extend(terms(title));
    }

    let matched = query_terms.intersection(&doc_terms).count();
    matched as f32 / query_terms.len() as f32
}
