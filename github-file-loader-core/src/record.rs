//! Data model: remote tree entries, rendered content and the stored file record.
//!
//! [`FileRecord`] serialises into the shape content stores consume:
//! `{ id, data: { id, extension, username, repo }, body, rendered: { html, metadata }, digest }`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open metadata mapping produced by a render function.
pub type Metadata = Map<String, Value>;

/// Kind of a remote tree entry, as reported in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// A directory (`"tree"`).
    #[serde(rename = "tree")]
    Directory,
    /// A file (`"blob"`).
    #[serde(rename = "blob")]
    File,
    /// Anything else the API reports, e.g. submodule `"commit"` entries.
    #[serde(other)]
    Other,
}

/// One leaf of the recursive tree listing. Only `path` and `kind` are used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl TreeEntry {
    pub fn new(path: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
            mode: None,
            sha: None,
            url: None,
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::new(path, EntryKind::File)
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self::new(path, EntryKind::Directory)
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Output of every render function, success and fallback alike.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderedContent {
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl RenderedContent {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Empty render carrying a diagnostic in `metadata.error`.
    pub fn degraded(error: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("error".to_string(), Value::String(error.into()));
        Self {
            html: String::new(),
            metadata: Some(metadata),
        }
    }

    /// The `metadata.error` diagnostic, if present.
    pub fn error(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("error"))
            .and_then(Value::as_str)
    }
}

/// Provenance and identity fields stored alongside each record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordData {
    pub id: String,
    pub extension: String,
    pub username: String,
    pub repo: String,
}

/// The unit of storage: one per file per load, fully replacing the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub data: RecordData,
    /// Raw file contents.
    pub body: String,
    pub rendered: RenderedContent,
    /// Fingerprint of `body`, used by stores for change detection.
    pub digest: String,
}

impl FileRecord {
    pub fn new(
        path: &str,
        username: &str,
        repo: &str,
        body: String,
        rendered: RenderedContent,
        digest: String,
    ) -> Self {
        let (id, extension) = split_path(path);
        Self {
            id: id.to_string(),
            data: RecordData {
                id: id.to_string(),
                extension: extension.to_string(),
                username: username.to_string(),
                repo: repo.to_string(),
            },
            body,
            rendered,
            digest,
        }
    }

    pub fn extension(&self) -> &str {
        &self.data.extension
    }
}

/// Splits a path into `(id, extension)` on dots.
///
/// `id` is everything before the first `.`, `extension` the segment between
/// the first and second `.`. A multi-dot name such as `a.b.c.md` therefore
/// yields `("a", "b")`, not the real extension. A path without a dot yields an
/// empty extension.
pub fn split_path(path: &str) -> (&str, &str) {
    let mut segments = path.split('.');
    let id = segments.next().unwrap_or_default();
    let extension = segments.next().unwrap_or_default();
    (id, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_path_nested_markdown() {
        assert_eq!(split_path("docs/a.md"), ("docs/a", "md"));
    }

    #[test]
    fn split_path_multi_dot_takes_second_segment() {
        assert_eq!(split_path("a.b.c.md"), ("a", "b"));
    }

    #[test]
    fn split_path_without_dot() {
        assert_eq!(split_path("LICENSE"), ("LICENSE", ""));
    }

    #[test]
    fn split_path_dot_in_directory_name() {
        assert_eq!(split_path("v1.2/notes.md"), ("v1", "2/notes"));
    }

    #[test]
    fn tree_entry_parses_github_payload() {
        let raw = r#"[
            {"path": "docs", "mode": "040000", "type": "tree", "sha": "abc", "url": "https://x"},
            {"path": "docs/a.md", "mode": "100644", "type": "blob", "sha": "def", "size": 12, "url": "https://y"},
            {"path": "vendor/lib", "mode": "160000", "type": "commit", "sha": "123"}
        ]"#;
        let entries: Vec<TreeEntry> = serde_json::from_str(raw).expect("valid tree payload");
        assert_eq!(entries[0].kind, EntryKind::Directory);
        assert_eq!(entries[1].kind, EntryKind::File);
        assert_eq!(entries[1].sha.as_deref(), Some("def"));
        assert_eq!(entries[2].kind, EntryKind::Other);
        assert!(entries[2].url.is_none());
    }

    #[test]
    fn file_record_serialises_store_shape() {
        let record = FileRecord::new(
            "policies/privacy.md",
            "octocat",
            "policies",
            "# Privacy".to_string(),
            RenderedContent::new("<h1>Privacy</h1>"),
            "d1".to_string(),
        );
        let json = serde_json::to_value(&record).expect("serialisable");
        assert_eq!(json["id"], "policies/privacy");
        assert_eq!(json["data"]["extension"], "md");
        assert_eq!(json["data"]["username"], "octocat");
        assert_eq!(json["data"]["repo"], "policies");
        assert_eq!(json["body"], "# Privacy");
        assert_eq!(json["rendered"]["html"], "<h1>Privacy</h1>");
        assert!(json["rendered"].get("metadata").is_none());
        assert_eq!(json["digest"], "d1");
    }

    #[test]
    fn degraded_render_exposes_error() {
        let rendered = RenderedContent::degraded("boom");
        assert_eq!(rendered.html, "");
        assert_eq!(rendered.error(), Some("boom"));
    }
}
