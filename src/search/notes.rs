//! Notes: the documents being searched

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{ResonanceError, Result};

/// A searchable note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub body: String,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Text handed to the embedding model.
    pub fn embedding_text(&self) -> String {
        match (self.title.trim().is_empty(), self.body.trim().is_empty()) {
            (true, _) => self.body.clone(),
            (false, true) => self.title.clone(),
            (false, false) => format!("{}\n\n{}", self.title, self.body),
        }
    }
}

/// Notes by id, used to hydrate and filter results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteStore {
    notes: HashMap<String, Note>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a note, returning the previous version.
    pub fn upsert(&mut self, note: Note) -> Option<Note> {
        self.notes.insert(note.id.clone(), note)
    }

    pub fn remove(&mut self, id: &str) -> Option<Note> {
        self.notes.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.notes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }
}

/// Load `.md` and `.txt` files under `dir` as notes.
///
/// The id is the path relative to `dir`. The title is the first markdown
/// heading, or the file stem when there is none; the heading line is not
/// repeated in the body.
pub fn load_notes_from_dir(dir: &Path) -> Result<Vec<Note>> {
    let mut notes = Vec::new();
    collect_notes(dir, dir, &mut notes)?;
    notes.sort_by(|a, b| a.id.cmp(&b.id));
    tracing::info!("Loaded {} notes from {}", notes.len(), dir.display());
    Ok(notes)
}

fn collect_notes(root: &Path, dir: &Path, notes: &mut Vec<Note>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| ResonanceError::Io {
        source: e,
        context: format!("Failed to read directory: {}", dir.display()),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ResonanceError::Io {
            source: e,
            context: format!("Failed to read entry in {}", dir.display()),
        })?;
        let path = entry.path();

        if path.is_dir() {
            collect_notes(root, &path, notes)?;
            continue;
        }

        let is_note = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("md") | Some("txt")
        );
        if !is_note {
            continue;
        }

        let content = fs::read_to_string(&path).map_err(|e| ResonanceError::Io {
            source: e,
            context: format!("Failed to read note: {}", path.display()),
        })?;
        let updated_at = entry
            .metadata()
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        let id = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.clone());
        let (title, body) = split_title(&content, stem);

        notes.push(Note {
            id,
            title,
            body,
            updated_at,
        });
    }
    Ok(())
}

fn split_title(content: &str, fallback: String) -> (String, String) {
    let mut lines = content.lines();
    for line in lines.by_ref() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(heading) = trimmed.strip_prefix('#') {
            let title = heading.trim_start_matches('#').trim().to_string();
            let body: Vec<&str> = lines.collect();
            return (title, body.join("\n").trim().to_string());
        }
        break;
    }
    (fallback, content.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_embedding_text() {
        assert_eq!(Note::new("a", "Title", "Body").embedding_text(), "Title\n\nBody");
        assert_eq!(Note::new("a", "", "Body").embedding_text(), "Body");
        assert_eq!(Note::new("a", "Title", " ").embedding_text(), "Title");
    }

    #[test]
    fn test_store_upsert_replaces() {
        let mut store = NoteStore::new();
        assert!(store.upsert(Note::new("a", "One", "")).is_none());
        let previous = store.upsert(Note::new("a", "Two", "")).unwrap();
        assert_eq!(previous.title, "One");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().title, "Two");
        assert!(store.remove("a").is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn test_split_title() {
        let (title, body) = split_title("\n# Jon Snow\n\nKing in the north", "f".into());
        assert_eq!(title, "Jon Snow");
        assert_eq!(body, "King in the north");

        let (title, body) = split_title("no heading here", "file".into());
        assert_eq!(title, "file");
        assert_eq!(body, "no heading here");
    }

    #[test]
    fn test_load_notes_from_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("a.md"), "# Alpha\nfirst").unwrap();
        fs::write(temp.path().join("sub/b.txt"), "second").unwrap();
        fs::write(temp.path().join("image.png"), [0u8, 1, 2]).unwrap();

        let notes = load_notes_from_dir(temp.path()).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, "a.md");
        assert_eq!(notes[0].title, "Alpha");
        assert_eq!(notes[1].id, "sub/b.txt");
        assert_eq!(notes[1].title, "b");
        assert_eq!(notes[1].body, "second");
    }
}
