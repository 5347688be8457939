//! Source-document fetch collaborator.

use std::path::{Path, PathBuf};

use crate::error::CollabError;

/// Fetches the full text of a source document by its opaque id.
pub trait DocumentSource: Send + Sync {
    fn fetch_text(&self, doc_id: &str) -> Result<String, CollabError>;
}

/// [`DocumentSource`] reading documents from a local directory tree.
///
/// The document id is its path relative to the root. Ids that try to escape
/// the root are rejected as invalid rather than resolved.
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl DocumentSource for FileSource {
    fn fetch_text(&self, doc_id: &str) -> Result<String, CollabError> {
        if doc_id.is_empty() {
            return Err(CollabError::InvalidRequest("empty document id".to_string()));
        }
        if Path::new(doc_id).is_absolute() || doc_id.contains("..") {
            return Err(CollabError::InvalidRequest(format!(
                "document id escapes the source root: {}",
                doc_id
            )));
        }

        let path = self.root.join(doc_id);
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CollabError::NotFound(doc_id.to_string()),
            _ => CollabError::Unavailable(format!("{}: {}", path.display(), e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fetch_existing_document() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("guide.md"), "Settings moved to the side menu").unwrap();

        let source = FileSource::new(dir.path());
        let text = source.fetch_text("guide.md").unwrap();
        assert!(text.contains("side menu"));
    }

    #[test]
    fn test_missing_document_is_not_found() {
        let dir = TempDir::new().unwrap();
        let source = FileSource::new(dir.path());
        assert!(matches!(
            source.fetch_text("absent.md"),
            Err(CollabError::NotFound(_))
        ));
    }

    #[test]
    fn test_traversal_ids_rejected() {
        let dir = TempDir::new().unwrap();
        let source = FileSource::new(dir.path());
        assert!(matches!(
            source.fetch_text("../etc/passwd"),
            Err(CollabError::InvalidRequest(_))
        ));
        assert!(matches!(
            source.fetch_text("/etc/passwd"),
            Err(CollabError::InvalidRequest(_))
        ));
        assert!(matches!(
            source.fetch_text(""),
            Err(CollabError::InvalidRequest(_))
        ));
    }
}
