use crate::agents::viz::{ChartData, ChartSpec};
use crate::db::table::ResultTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// A result table as persisted with a chat message, capped so the history
/// file stays bounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TableSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_spec: Option<ChartSpec>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentInfo {
    pub name: String,
    pub message_count: usize,
    pub modified: String,
}

/// Chat history persisted to `conversation.json`, with named snapshots under
/// `chat_segments/`.
pub struct ChatStore {
    conversation_path: PathBuf,
    segments_dir: PathBuf,
    row_cap: usize,
    log: Mutex<Vec<ChatMessage>>,
}

impl ChatStore {
    pub fn new(data_dir: &Path, row_cap: usize) -> std::io::Result<Self> {
        let segments_dir = data_dir.join("chat_segments");
        std::fs::create_dir_all(&segments_dir)?;

        let store = Self {
            conversation_path: data_dir.join("conversation.json"),
            segments_dir,
            row_cap,
            log: Mutex::new(Vec::new()),
        };
        store.load()?;
        Ok(store)
    }

    /// Loads the conversation file. A corrupt file is moved aside with a
    /// timestamped name and the history starts fresh.
    fn load(&self) -> std::io::Result<()> {
        if !self.conversation_path.exists() {
            return Ok(());
        }
        let raw = std::fs::read_to_string(&self.conversation_path)?;
        match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
            Ok(messages) => {
                info!("Loaded {} chat messages", messages.len());
                *self.log.lock().unwrap_or_else(|e| e.into_inner()) = messages;
            }
            Err(e) => {
                let ts = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                let backup = self
                    .conversation_path
                    .with_file_name(format!("conversation_backup_{}.json", ts));
                warn!(
                    "Conversation file is corrupt ({}), moving to {}",
                    e,
                    backup.display()
                );
                std::fs::rename(&self.conversation_path, &backup)?;
            }
        }
        Ok(())
    }

    fn save_messages(path: &Path, messages: &[ChatMessage]) -> std::io::Result<()> {
        let raw = serde_json::to_string_pretty(messages)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, raw)
    }

    pub fn snapshot_table(&self, table: &ResultTable) -> TableSnapshot {
        let truncated = table.row_count() > self.row_cap;
        let preview = table.head(self.row_cap);
        TableSnapshot {
            columns: preview.columns,
            rows: preview.rows,
            row_count: table.row_count(),
            truncated,
        }
    }

    pub fn append(&self, message: ChatMessage) -> std::io::Result<()> {
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.push(message);
        Self::save_messages(&self.conversation_path, &log)
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) -> std::io::Result<()> {
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.clear();
        if self.conversation_path.exists() {
            std::fs::remove_file(&self.conversation_path)?;
        }
        Ok(())
    }

    fn segment_path(&self, name: &str) -> PathBuf {
        self.segments_dir.join(format!("{}.json", sanitize(name)))
    }

    /// Saves the current conversation as a named segment.
    pub fn save_segment(&self, name: &str) -> std::io::Result<()> {
        let log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        Self::save_messages(&self.segment_path(name), &log)
    }

    /// Replaces the live conversation with a stored segment.
    pub fn load_segment(&self, name: &str) -> std::io::Result<usize> {
        let raw = std::fs::read_to_string(self.segment_path(name))?;
        let messages: Vec<ChatMessage> = serde_json::from_str(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let count = messages.len();
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        *log = messages;
        Self::save_messages(&self.conversation_path, &log)?;
        Ok(count)
    }

    pub fn rename_segment(&self, from: &str, to: &str) -> std::io::Result<()> {
        std::fs::rename(self.segment_path(from), self.segment_path(to))
    }

    pub fn delete_segment(&self, name: &str) -> std::io::Result<()> {
        std::fs::remove_file(self.segment_path(name))
    }

    /// Segments newest-first by modification time.
    pub fn list_segments(&self) -> std::io::Result<Vec<SegmentInfo>> {
        let mut segments = Vec::new();
        for entry in std::fs::read_dir(&self.segments_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = std::fs::read_to_string(&path)?;
            let message_count = serde_json::from_str::<Vec<ChatMessage>>(&raw)
                .map(|m| m.len())
                .unwrap_or(0);
            let modified = entry
                .metadata()?
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);
            segments.push((modified, SegmentInfo {
                name: name.to_string(),
                message_count,
                modified: modified.to_string(),
            }));
        }
        segments.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(segments.into_iter().map(|(_, info)| info).collect())
    }
}

/// Segment names are restricted to alphanumerics, dash and underscore so
/// they cannot escape the segments directory.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "{}_{}_{}",
            name,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn message(content: &str) -> ChatMessage {
        ChatMessage {
            role: "user".to_string(),
            content: content.to_string(),
            sql: None,
            data: None,
            chart: None,
            chart_spec: None,
            timestamp: now_timestamp(),
        }
    }

    #[test]
    fn appends_persist_across_reopen() {
        let dir = temp_dir("chat_store");
        {
            let store = ChatStore::new(&dir, 500).unwrap();
            store.append(message("hello")).unwrap();
            store.append(message("world")).unwrap();
        }
        let store = ChatStore::new(&dir, 500).unwrap();
        let history = store.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "world");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn corrupt_file_is_backed_up_not_fatal() {
        let dir = temp_dir("chat_store_corrupt");
        std::fs::write(dir.join("conversation.json"), "{{{not json").unwrap();

        let store = ChatStore::new(&dir, 500).unwrap();
        assert!(store.history().is_empty());

        let backups: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("conversation_backup_")
            })
            .collect();
        assert_eq!(backups.len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn snapshot_caps_rows() {
        let dir = temp_dir("chat_store_cap");
        let store = ChatStore::new(&dir, 2).unwrap();

        let mut table = ResultTable::new(vec!["n".into()]);
        for i in 0..5 {
            table.rows.push(vec![json!(i)]);
        }
        let snapshot = store.snapshot_table(&table);
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.row_count, 5);
        assert!(snapshot.truncated);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn segments_round_trip_and_sanitize() {
        let dir = temp_dir("chat_store_segments");
        let store = ChatStore::new(&dir, 500).unwrap();
        store.append(message("a")).unwrap();
        store.save_segment("my analysis!").unwrap();

        assert!(dir.join("chat_segments").join("my_analysis_.json").exists());

        store.clear().unwrap();
        assert!(store.history().is_empty());

        let count = store.load_segment("my analysis!").unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.history()[0].content, "a");

        store.rename_segment("my analysis!", "kept").unwrap();
        let segments = store.list_segments().unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].name, "kept");

        store.delete_segment("kept").unwrap();
        assert!(store.list_segments().unwrap().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }
}
