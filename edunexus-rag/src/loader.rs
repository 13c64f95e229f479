//! Source document loaders.
//!
//! [`PdfLoader`] shells out to poppler's `pdftotext` and yields one
//! [`Document`] per page; [`TextLoader`] reads `.txt`/`.md` files whole.
//! [`LoaderSet`] picks the right loader by file extension.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::document::{Document, PAGE_KEY, SOURCE_KEY};
use crate::error::{RagError, Result};

/// Page separator emitted by `pdftotext`.
const FORM_FEED: char = '\u{c}';

/// Turns a file on disk into documents.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Whether this loader understands `path` (usually by extension).
    fn supports(&self, path: &Path) -> bool;

    /// Load `path`. Pages without text are skipped.
    async fn load(&self, path: &Path) -> Result<Vec<Document>>;
}

/// Loads PDFs through the `pdftotext` command-line tool.
#[derive(Debug, Clone)]
pub struct PdfLoader {
    program: String,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self { program: "pdftotext".to_string() }
    }
}

impl PdfLoader {
    /// Use `pdftotext` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `pdftotext` executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    fn supports(&self, path: &Path) -> bool {
        has_extension(path, &["pdf"])
    }

    async fn load(&self, path: &Path) -> Result<Vec<Document>> {
        debug!(path = %path.display(), program = %self.program, "extracting PDF text");
        let output = Command::new(&self.program)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .await
            .map_err(|e| RagError::LoaderError {
                path: path.display().to_string(),
                message: format!("failed to run {}: {e}; is poppler-utils installed?", self.program),
            })?;

        if !output.status.success() {
            return Err(RagError::LoaderError {
                path: path.display().to_string(),
                message: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let documents = split_pages(path, &text);
        if documents.is_empty() {
            warn!(path = %path.display(), "no text extracted; the PDF may be scanned images");
        }
        Ok(documents)
    }
}

/// Loads plain-text and markdown files as a single document.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLoader;

#[async_trait]
impl DocumentLoader for TextLoader {
    fn supports(&self, path: &Path) -> bool {
        has_extension(path, &["txt", "md"])
    }

    async fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| RagError::LoaderError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let document = Document::new(document_id(path), text)
            .with_metadata(SOURCE_KEY, path.display().to_string());
        Ok(vec![document])
    }
}

/// Dispatches to the first loader that supports a path.
pub struct LoaderSet {
    loaders: Vec<Box<dyn DocumentLoader>>,
}

impl Default for LoaderSet {
    fn default() -> Self {
        Self { loaders: vec![Box::new(PdfLoader::new()), Box::new(TextLoader)] }
    }
}

impl LoaderSet {
    /// A set with no loaders; add some with [`LoaderSet::with_loader`].
    pub fn empty() -> Self {
        Self { loaders: Vec::new() }
    }

    /// Append a loader. Earlier loaders win.
    pub fn with_loader(mut self, loader: Box<dyn DocumentLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Load `path` with the first loader that supports it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::LoaderError`] if no loader supports the file type,
    /// or the chosen loader's error.
    pub async fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let loader = self.loaders.iter().find(|l| l.supports(path)).ok_or_else(|| {
            RagError::LoaderError {
                path: path.display().to_string(),
                message: "unsupported file type (expected .pdf, .txt or .md)".into(),
            }
        })?;
        loader.load(path).await
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Stable document id derived from a file name: lowercase, with runs of
/// anything but ASCII letters and digits collapsed to `-`.
pub fn document_id(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("document");
    let mut id = String::with_capacity(stem.len());
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            id.push(c.to_ascii_lowercase());
        } else if !id.ends_with('-') {
            id.push('-');
        }
    }
    let id = id.trim_matches('-');
    if id.is_empty() { "document".to_string() } else { id.to_string() }
}

/// Split `pdftotext` output into one document per non-blank page.
pub fn split_pages(path: &Path, text: &str) -> Vec<Document> {
    let prefix = document_id(path);
    let source = path.display().to_string();
    text.split(FORM_FEED)
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| {
            let number = i + 1;
            Document::new(format!("{prefix}_p{number}"), page.trim())
                .with_metadata(SOURCE_KEY, source.clone())
                .with_metadata(PAGE_KEY, number.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn ids_are_slugged_file_stems() {
        assert_eq!(document_id(Path::new("books/science 10th std.pdf")), "science-10th-std");
        assert_eq!(document_id(Path::new("hist 6 th std.pdf")), "hist-6-th-std");
        assert_eq!(document_id(Path::new("???.pdf")), "document");
    }

    #[test]
    fn pages_split_on_form_feed_and_blank_pages_skipped() {
        let path = PathBuf::from("geo 7th std.pdf");
        let docs = split_pages(&path, "Rivers flow.\u{c}   \u{c}Mountains rise.\u{c}");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "geo-7th-std_p1");
        assert_eq!(docs[0].text, "Rivers flow.");
        assert_eq!(docs[1].id, "geo-7th-std_p3");
        assert_eq!(docs[1].metadata.get(PAGE_KEY).map(String::as_str), Some("3"));
        assert_eq!(docs[1].metadata.get(SOURCE_KEY).map(String::as_str), Some("geo 7th std.pdf"));
    }

    #[test]
    fn extension_matching_ignores_case() {
        assert!(PdfLoader::new().supports(Path::new("a.PDF")));
        assert!(TextLoader.supports(Path::new("notes.md")));
        assert!(!TextLoader.supports(Path::new("a.pdf")));
    }

    #[tokio::test]
    async fn text_loader_reads_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Physics Notes.txt");
        std::fs::write(&path, "Force equals mass times acceleration.").unwrap();

        let docs = LoaderSet::default().load(&path).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "physics-notes");
        assert_eq!(docs[0].text, "Force equals mass times acceleration.");
    }

    #[tokio::test]
    async fn unsupported_extension_is_an_error() {
        let err = LoaderSet::default().load(Path::new("slides.pptx")).await.unwrap_err();
        assert!(matches!(err, RagError::LoaderError { .. }));
    }

    #[tokio::test]
    async fn missing_pdftotext_is_reported() {
        let loader = PdfLoader::with_program("definitely-not-a-real-pdftotext");
        let err = loader.load(Path::new("book.pdf")).await.unwrap_err();
        assert!(err.to_string().contains("failed to run"));
    }
}
