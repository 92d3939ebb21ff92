use std::fs;
use std::io;
use std::path::Path;
use uuid::Uuid;

/// A document loaded into the session. Immutable once loaded; replaced
/// wholesale on re-upload. The id doubles as the staleness token for
/// in-flight requests issued against this document.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub id: Uuid,
    pub name: String,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("unsupported file type: .{0} (plain-text files only)")]
    UnsupportedType(String),
    #[error("failed to read file: {0}")]
    Read(#[from] io::Error),
}

/// Load a plain-text file fully into memory.
///
/// Only `.txt`/`.text` files are accepted; everything else fails without
/// touching any session state. Non-UTF-8 content surfaces as a read error.
pub fn load(path: &Path) -> Result<LoadedDocument, DocumentError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "txt" | "text" => {
            let text = fs::read_to_string(path)?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("document.txt")
                .to_string();
            Ok(LoadedDocument {
                id: Uuid::new_v4(),
                name,
                text,
            })
        }
        _ => Err(DocumentError::UnsupportedType(ext)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_txt_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "Alice met Bob in Paris on May 1.").unwrap();

        let doc = load(&path).unwrap();
        assert_eq!(doc.name, "notes.txt");
        assert_eq!(doc.text, "Alice met Bob in Paris on May 1.");
    }

    #[test]
    fn rejects_non_text_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        fs::write(&path, "%PDF-1.4").unwrap();

        match load(&path) {
            Err(DocumentError::UnsupportedType(ext)) => assert_eq!(ext, "pdf"),
            other => panic!("expected UnsupportedType, got {:?}", other.map(|d| d.name)),
        }
    }

    #[test]
    fn read_failure_on_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.txt");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(&[0xff, 0xfe, 0x00, 0x80]).unwrap();

        assert!(matches!(load(&path), Err(DocumentError::Read(_))));
    }

    #[test]
    fn fresh_id_per_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("same.txt");
        fs::write(&path, "content").unwrap();

        let a = load(&path).unwrap();
        let b = load(&path).unwrap();
        assert_ne!(a.id, b.id);
    }
}
