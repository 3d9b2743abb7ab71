//! PDF-to-Markdown converter (C10).
//!
//! Converts a `.pdf` file, already resolved via [`crate::safe_path`], into a
//! sibling Markdown file under the same allowlisted root. Never returns the
//! converted body inline — only path and size metadata (spec §4.10) — since
//! the body can be megabytes and the caller fetches it through the normal
//! markdown-ingest flow if it wants chunks out of it.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::errors::ConvertError;
use crate::safe_path::SafePath;

/// Default per-file character cap (spec §4.10).
pub const DEFAULT_MAX_OUTPUT_CHARS: usize = 5_000_000;

#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub output_path: PathBuf,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub elapsed_ms: u64,
    pub truncated: bool,
}

/// Convert `input` (already [`resolve`](crate::safe_path::resolve)d, `.pdf`
/// suffix) to Markdown at `{stem}.md` next to it. `overwrite` defaults to
/// `true` at the tool-surface layer; this function respects whatever the
/// caller passes.
pub fn convert_pdf_to_markdown(
    input: &SafePath,
    overwrite: bool,
    max_output_chars: usize,
) -> Result<ConversionResult, ConvertError> {
    let started = Instant::now();

    let output_path = sibling_markdown_path(&input.absolute);
    if output_path.exists() && !overwrite {
        return Err(ConvertError::Failed(format!(
            "{} already exists and overwrite=false",
            output_path.display()
        )));
    }

    let bytes = std::fs::read(&input.absolute)?;
    let raw_text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| ConvertError::Failed(format!("pdf extraction failed: {e}")))?;

    let markdown = to_markdown(&raw_text);
    let (markdown, truncated) = cap_chars(markdown, max_output_chars);

    std::fs::write(&output_path, &markdown)?;

    Ok(ConversionResult {
        output_path,
        bytes_in: input.size_bytes,
        bytes_out: markdown.len() as u64,
        elapsed_ms: started.elapsed().as_millis() as u64,
        truncated,
    })
}

fn sibling_markdown_path(input: &Path) -> PathBuf {
    input.with_extension("md")
}

/// Turn raw extracted PDF text into Markdown. The extractor gives us plain
/// text with page breaks as blank-line runs; we keep those as paragraph
/// breaks and otherwise pass the text through untouched — no attempt at
/// structural reconstruction (headings, tables), since the source PDF gives
/// us no reliable signal for that.
fn to_markdown(raw_text: &str) -> String {
    let mut out = String::with_capacity(raw_text.len());
    let mut blank_run = 0;
    for line in raw_text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run <= 1 {
                out.push('\n');
            }
        } else {
            blank_run = 0;
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out
}

fn cap_chars(text: String, max_chars: usize) -> (String, bool) {
    let total = text.chars().count();
    if total <= max_chars {
        (text, false)
    } else {
        (text.chars().take(max_chars).collect(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_path_swaps_extension() {
        let path = sibling_markdown_path(Path::new("/root/docs/contract.pdf"));
        assert_eq!(path, PathBuf::from("/root/docs/contract.md"));
    }

    #[test]
    fn markdown_collapses_multiple_blank_lines() {
        let input = "Para one.\n\n\n\nPara two.\n";
        let out = to_markdown(input);
        assert!(!out.contains("\n\n\n"));
        assert!(out.contains("Para one."));
        assert!(out.contains("Para two."));
    }

    #[test]
    fn cap_chars_truncates_and_reports() {
        let text = "x".repeat(100);
        let (capped, truncated) = cap_chars(text, 10);
        assert_eq!(capped.len(), 10);
        assert!(truncated);
    }

    #[test]
    fn cap_chars_leaves_short_text_untouched() {
        let (capped, truncated) = cap_chars("hello".to_string(), 100);
        assert_eq!(capped, "hello");
        assert!(!truncated);
    }
}
