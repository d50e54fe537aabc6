//! Document text extraction.
//!
//! PDFs are read page by page with `pdf-extract`. Any other file is read as
//! UTF-8 text and treated as a single page. Extraction never panics; a file
//! that cannot be parsed becomes [`PipelineError::Extract`].

use std::path::Path;

use crate::error::PipelineError;

/// Text of a document, one entry per page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub pages: Vec<String>,
}

impl ExtractedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// True when no page contains anything but whitespace.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }
}

pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Read `path` and extract its text.
pub fn extract_document(path: &Path) -> Result<ExtractedDocument, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::DocumentNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)
        .map_err(|e| PipelineError::Extract(format!("{}: {}", path.display(), e)))?;

    if is_pdf(path) {
        extract_pdf_pages(&bytes)
    } else {
        let text = String::from_utf8(bytes).map_err(|_| {
            PipelineError::Extract(format!("{} is not valid UTF-8 text", path.display()))
        })?;
        Ok(ExtractedDocument { pages: vec![text] })
    }
}

/// Extract text from in-memory PDF bytes, one string per page.
pub fn extract_pdf_pages(bytes: &[u8]) -> Result<ExtractedDocument, PipelineError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| PipelineError::Extract(format!("PDF extraction failed: {}", e)))?;
    Ok(ExtractedDocument { pages })
}
