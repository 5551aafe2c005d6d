//! PDF text extraction.
//!
//! Pages are read in document order and each page's text is normalized by collapsing runs of
//! newlines before being appended, followed by a single `\n`, to the full report.

use lopdf::Document;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while turning a PDF into plain text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// No file exists at the requested path.
    #[error("PDF file not found: {}", path.display())]
    NotFound {
        /// Path that was requested.
        path: PathBuf,
    },
    /// The file exists but could not be parsed as a PDF.
    #[error("Failed to parse PDF {}: {source}", path.display())]
    Parse {
        /// Path of the unreadable document.
        path: PathBuf,
        /// Underlying parser error.
        #[source]
        source: lopdf::Error,
    },
    /// A page's content stream could not be decoded into text.
    #[error("Failed to extract text from page {page}: {source}")]
    Page {
        /// One-based page number.
        page: u32,
        /// Underlying parser error.
        #[source]
        source: lopdf::Error,
    },
}

/// Extract the full normalized text of the PDF at `path`.
///
/// Returns an empty string when the document contains no extractable text.
pub fn extract_text(path: &Path) -> Result<String, ExtractionError> {
    if !path.exists() {
        return Err(ExtractionError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let document = Document::load(path).map_err(|source| ExtractionError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let pages = document.get_pages();
    tracing::debug!(path = %path.display(), pages = pages.len(), "Loaded PDF");

    let mut page_texts = Vec::with_capacity(pages.len());
    for page in pages.keys().copied() {
        let text = document
            .extract_text(&[page])
            .map_err(|source| ExtractionError::Page { page, source })?;
        page_texts.push(text);
    }

    let report = join_pages(page_texts);
    tracing::debug!(path = %path.display(), chars = report.len(), "Extracted PDF text");
    Ok(report)
}

/// Normalize each page and concatenate them, terminating every page with one newline.
pub(crate) fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = String::new();
    for page in pages {
        report.push_str(&collapse_blank_lines(page.as_ref()));
        report.push('\n');
    }

    // A document without any text content yields an empty report rather than bare newlines.
    if report.chars().all(|ch| ch == '\n') {
        report.clear();
    }
    report
}

/// Collapse every run of consecutive `\n` characters into a single `\n`.
///
/// This is the fixed point of repeatedly replacing `"\n\n"` with `"\n"`, so applying it to its
/// own output is a no-op. Lines holding only spaces are content and are left alone.
pub fn collapse_blank_lines(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut previous_newline = false;
    for ch in text.chars() {
        if ch == '\n' {
            if previous_newline {
                continue;
            }
            previous_newline = true;
        } else {
            previous_newline = false;
        }
        collapsed.push(ch);
    }
    collapsed
}
