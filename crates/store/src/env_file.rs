use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{KeyValueStore, StoreError};

/// Flat `KEY='value'` file holding every collection as one line.
///
/// Reads always parse the file from disk. Writes re-read the whole file,
/// patch the one entry and replace the file through a temp file + rename,
/// so other lines (comments, tokens, unrelated keys) survive untouched.
pub struct EnvFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl EnvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_contents(&self) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(self.io_error("read", source)),
        }
    }

    async fn replace_contents(&self, contents: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error("created", source))?;
        }

        let temp_path = temp_path_for(&self.path);
        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|source| self.io_error("written", source))?;
        file.write_all(contents.as_bytes())
            .await
            .map_err(|source| self.io_error("written", source))?;
        file.sync_all().await.map_err(|source| self.io_error("synced", source))?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|source| self.io_error("replaced", source))
    }

    fn io_error(&self, action: &'static str, source: std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), action, source }
    }
}

#[async_trait]
impl KeyValueStore for EnvFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(contents) = self.read_contents().await? else {
            return Ok(None);
        };

        let mut found = None;
        for (index, line) in contents.lines().enumerate() {
            let Some((line_key, raw_value)) = split_entry(line) else {
                if !is_blank_or_comment(line) {
                    warn!(
                        event_name = "store.env_file.line_skipped",
                        path = %self.path.display(),
                        line = index + 1,
                        "skipping store line that is not a KEY=VALUE entry"
                    );
                }
                continue;
            };
            if line_key != key {
                continue;
            }

            let value = parse_value(raw_value)
                .ok_or_else(|| StoreError::Syntax { path: self.path.clone(), line: index + 1 })?;
            found = Some(value);
        }

        Ok(found)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _write = self.write_lock.lock().await;
        let existing = self.read_contents().await?.unwrap_or_default();
        let entry = encode_entry(key, value);

        let mut replaced = false;
        let mut lines = Vec::new();
        for line in existing.lines() {
            match split_entry(line) {
                Some((line_key, _)) if line_key == key => {
                    if !replaced {
                        lines.push(entry.clone());
                        replaced = true;
                    }
                }
                _ => lines.push(line.to_owned()),
            }
        }
        if !replaced {
            lines.push(entry);
        }

        let mut contents = lines.join("\n");
        contents.push('\n');
        self.replace_contents(&contents).await?;

        debug!(
            event_name = "store.env_file.written",
            path = %self.path.display(),
            key,
            bytes = contents.len(),
            "store file rewritten"
        );
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Splits `[export ]KEY=rest` into the key and the unparsed value.
fn split_entry(line: &str) -> Option<(&str, &str)> {
    if is_blank_or_comment(line) {
        return None;
    }

    let trimmed = line.trim_start();
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Returns `None` when a quoted value is never closed.
fn parse_value(raw: &str) -> Option<String> {
    let raw = raw.trim_start();
    if let Some(body) = raw.strip_prefix('\'') {
        return parse_quoted(body, '\'');
    }
    if let Some(body) = raw.strip_prefix('"') {
        return parse_quoted(body, '"');
    }

    let value = match raw.find(" #") {
        Some(comment_start) => &raw[..comment_start],
        None => raw,
    };
    Some(value.trim_end().to_owned())
}

fn parse_quoted(body: &str, quote: char) -> Option<String> {
    let mut output = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(ch) = chars.next() {
        if ch == quote {
            return Some(output);
        }
        if ch != '\\' {
            output.push(ch);
            continue;
        }

        match chars.next()? {
            next if next == quote || next == '\\' => output.push(next),
            'n' if quote == '"' => output.push('\n'),
            'r' if quote == '"' => output.push('\r'),
            't' if quote == '"' => output.push('\t'),
            other => {
                output.push('\\');
                output.push(other);
            }
        }
    }

    None
}

fn encode_entry(key: &str, value: &str) -> String {
    if value.contains(['\n', '\r']) {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
            .replace('\r', "\\r");
        return format!("{key}=\"{escaped}\"");
    }

    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("{key}='{escaped}'")
}
