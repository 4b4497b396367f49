use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The whole on-disk dataset: author name mapped to that author's record.
pub type Document = BTreeMap<String, AuthorRecord>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorRecord {
    #[serde(default)]
    pub intents: Vec<TagEntry>,
}

/// One conversational intent: a tag name with its example inputs and
/// candidate responses. Ordering of both lists is preserved everywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagEntry {
    pub tag: String,
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub responses: Vec<String>,
}

impl TagEntry {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), input: Vec::new(), responses: Vec::new() }
    }
}

pub fn data_file() -> io::Result<PathBuf> {
    if let Ok(path) = std::env::var("INTENT_TAGS_FILE") {
        return Ok(PathBuf::from(path));
    }
    let home = std::env::var("HOME").map_err(|_| {
        io::Error::other("HOME not set; set INTENT_TAGS_FILE explicitly")
    })?;
    Ok(PathBuf::from(home)
        .join(".intent_tags")
        .join("content_by_author_and_tags.json"))
}

/// Read and parse the whole document. Callers decide how to report a
/// failure; the usual answer is a message and an empty document.
pub fn load(path: &Path) -> Result<Document, Box<dyn Error>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Serialize the whole document back with stable pretty formatting.
/// Single write, no temp-file swap.
pub fn save(path: &Path, doc: &Document) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut rendered = serde_json::to_string_pretty(doc)?;
    rendered.push('\n');
    fs::write(path, rendered)?;
    Ok(())
}

/// Append a new tag to an author. Rejects an empty name and a name already
/// present for that author (case-sensitive exact match).
pub fn add_tag(record: &mut AuthorRecord, entry: TagEntry) -> Result<(), String> {
    if entry.tag.is_empty() {
        return Err("tag name must not be empty".to_string());
    }
    if record.intents.iter().any(|t| t.tag == entry.tag) {
        return Err(format!("tag '{}' already exists", entry.tag));
    }
    record.intents.push(entry);
    Ok(())
}

/// Append a value to a string list unless an exact duplicate is present.
/// Returns whether the value was added.
pub fn push_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|v| v == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_doc() -> Document {
        let mut doc = Document::new();
        let mut record = AuthorRecord::default();
        record.intents.push(TagEntry {
            tag: "greeting".to_string(),
            input: vec!["hi".to_string(), "hello".to_string()],
            responses: vec!["hello there".to_string()],
        });
        doc.insert("Alice".to_string(), record);
        doc
    }

    #[test]
    fn save_then_load_is_a_fixed_point() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("data.json");
        save(&path, &sample_doc()).unwrap();

        let first = std::fs::read_to_string(&path).unwrap();
        let reloaded = load(&path).unwrap();
        save(&path, &reloaded).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn load_tolerates_missing_lists() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("data.json");
        std::fs::write(&path, r#"{"Bob": {"intents": [{"tag": "bare"}]}}"#)
            .unwrap();
        let doc = load(&path).unwrap();
        let entry = &doc["Bob"].intents[0];
        assert!(entry.input.is_empty());
        assert!(entry.responses.is_empty());
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let tmp = tempdir().unwrap();
        assert!(load(&tmp.path().join("absent.json")).is_err());
    }

    #[test]
    fn duplicate_tag_is_rejected_without_mutation() {
        let mut doc = sample_doc();
        let record = doc.get_mut("Alice").unwrap();
        let before = record.intents.len();
        let err = add_tag(record, TagEntry::new("greeting")).unwrap_err();
        assert!(err.contains("already exists"));
        assert_eq!(record.intents.len(), before);
    }

    #[test]
    fn duplicate_check_is_case_sensitive() {
        let mut doc = sample_doc();
        let record = doc.get_mut("Alice").unwrap();
        assert!(add_tag(record, TagEntry::new("Greeting")).is_ok());
    }

    #[test]
    fn empty_tag_name_is_rejected() {
        let mut record = AuthorRecord::default();
        assert!(add_tag(&mut record, TagEntry::new("")).is_err());
    }

    #[test]
    fn push_unique_rejects_exact_duplicates() {
        let mut list = vec!["hi".to_string()];
        assert!(!push_unique(&mut list, "hi"));
        assert!(push_unique(&mut list, "Hi"));
        assert_eq!(list, vec!["hi", "Hi"]);
    }

    #[test]
    fn remove_by_index_keeps_order_of_the_rest() {
        let mut list =
            vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let removed = list.remove(1);
        assert_eq!(removed, "b");
        assert_eq!(list, vec!["a", "c"]);
    }
}
