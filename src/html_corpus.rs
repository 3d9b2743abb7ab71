//! Legal-HTML parser (C3, legal-HTML mode).
//!
//! Extracts one **norm document** (the full text of a legal norm) plus zero or
//! more **paragraph documents** (one per structural paragraph) from a single
//! legal-norm HTML page (spec §4.3). Uses `scraper` for DOM traversal and
//! `encoding_rs` to decode the source's declared legacy single-byte encoding,
//! falling back to replacement characters for undecodable input rather than
//! failing the document.

use encoding_rs::Encoding;
use scraper::{Html, Selector};

use crate::models::{ChunkMetadata, SourceKind};

/// One parsed document out of a legal-HTML page: either the norm itself or
/// one of its paragraphs.
#[derive(Debug, Clone)]
pub struct ParsedNormDocument {
    pub document_id: String,
    pub source_kind: SourceKind,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Parse a legal-norm HTML page into a norm document plus its paragraph
/// documents, in document order.
///
/// `raw` is the undecoded page bytes; `declared_encoding` is the source's
/// declared legacy single-byte encoding label (e.g. `"windows-1252"`,
/// `"iso-8859-1"`). `law_abbrev` and `jurisdiction` are supplied by the
/// ingestion engine from the corpus layout, since a single norm page does not
/// always name its own law.
pub fn parse_legal_html(
    raw: &[u8],
    declared_encoding: &str,
    law_abbrev: &str,
    jurisdiction: &str,
) -> Vec<ParsedNormDocument> {
    let text = decode_legacy(raw, declared_encoding);
    let document = Html::parse_document(&text);

    let law_title = first_text(&document, "h1, h2");
    let norm_id_raw = first_text(&document, "[role='norm-id']").unwrap_or_default();
    let norm_title = first_text(&document, "[role='norm-title']");
    let paragraphs = all_text(&document, "[role='paragraph']");

    let normalized_norm_id = normalize_norm_id(&norm_id_raw);
    let norm_document_id = format!(
        "{}_para_{}",
        law_abbrev.to_lowercase(),
        normalized_norm_id
    );

    let full_text = build_norm_full_text(&law_title, &norm_id_raw, &norm_title, &paragraphs);

    let mut norm_metadata = ChunkMetadata {
        source_name: norm_document_id.clone(),
        source_kind: SourceKind::CorpusNorm.as_str().to_string(),
        jurisdiction: Some(jurisdiction.to_string()),
        law_abbrev: Some(law_abbrev.to_string()),
        norm_id: Some(norm_id_raw.clone()),
        law_title: law_title.clone(),
        norm_title: norm_title.clone(),
        level: Some("norm".to_string()),
        ..Default::default()
    };
    norm_metadata.document_id = norm_document_id.clone();

    let mut out = vec![ParsedNormDocument {
        document_id: norm_document_id.clone(),
        source_kind: SourceKind::CorpusNorm,
        text: full_text,
        metadata: norm_metadata,
    }];

    if paragraphs.len() > 1 {
        for (i, paragraph_text) in paragraphs.iter().enumerate() {
            let paragraph_index = (i + 1) as i64;
            let paragraph_document_id = format!("{}_abs_{}", norm_document_id, paragraph_index);

            let mut metadata = ChunkMetadata {
                source_name: paragraph_document_id.clone(),
                source_kind: SourceKind::CorpusNorm.as_str().to_string(),
                jurisdiction: Some(jurisdiction.to_string()),
                law_abbrev: Some(law_abbrev.to_string()),
                norm_id: Some(norm_id_raw.clone()),
                law_title: law_title.clone(),
                norm_title: norm_title.clone(),
                level: Some("paragraph".to_string()),
                paragraph_index: Some(paragraph_index),
                parent_norm_id: Some(norm_document_id.clone()),
                ..Default::default()
            };
            metadata.document_id = paragraph_document_id.clone();

            out.push(ParsedNormDocument {
                document_id: paragraph_document_id,
                source_kind: SourceKind::CorpusNorm,
                text: paragraph_text.clone(),
                metadata,
            });
        }
    }

    out
}

fn build_norm_full_text(
    law_title: &Option<String>,
    norm_id: &str,
    norm_title: &Option<String>,
    paragraphs: &[String],
) -> String {
    let mut parts = Vec::new();
    if let Some(t) = law_title {
        parts.push(t.clone());
    }
    if !norm_id.is_empty() {
        parts.push(norm_id.to_string());
    }
    if let Some(t) = norm_title {
        parts.push(t.clone());
    }
    parts.extend(paragraphs.iter().cloned());
    parts.join("\n\n")
}

/// Strip everything but alphanumerics and lowercase the rest, so `"§ 433"` →
/// `"433"` and `"Art 1"` → `"art1"`.
fn normalize_norm_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Decode `raw` using `declared_encoding`; unrecognised or undecodable input
/// falls back to the Unicode replacement character rather than failing the
/// document (spec §4.3: "never fail the document").
fn decode_legacy(raw: &[u8], declared_encoding: &str) -> String {
    let encoding = Encoding::for_label(declared_encoding.as_bytes()).unwrap_or(encoding_rs::WINDOWS_1252);
    let (cow, _, _had_errors) = encoding.decode(raw);
    cow.into_owned()
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|s| !s.is_empty())
}

fn all_text(document: &Html, selector: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&sel)
        .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <html><body>
          <h1>Bürgerliches Gesetzbuch</h1>
          <div role="norm-id">§ 433</div>
          <div role="norm-title">Vertragstypische Pflichten beim Kaufvertrag</div>
          <div role="paragraph">Der Verkäufer wird verpflichtet.</div>
          <div role="paragraph">Der Käufer wird verpflichtet.</div>
        </body></html>
    "#;

    #[test]
    fn extracts_norm_and_paragraphs() {
        let docs = parse_legal_html(SAMPLE.as_bytes(), "utf-8", "BGB", "DE");
        assert_eq!(docs.len(), 3, "one norm doc + two paragraph docs");
        assert_eq!(docs[0].document_id, "bgb_para_433");
        assert_eq!(docs[1].document_id, "bgb_para_433_abs_1");
        assert_eq!(docs[2].document_id, "bgb_para_433_abs_2");
        assert_eq!(docs[1].metadata.paragraph_index, Some(1));
        assert_eq!(docs[1].metadata.parent_norm_id.as_deref(), Some("bgb_para_433"));
    }

    #[test]
    fn single_paragraph_norm_has_no_paragraph_documents() {
        let html = r#"<html><body>
            <h1>Title</h1>
            <div role="norm-id">Art 1</div>
            <div role="paragraph">Only paragraph.</div>
        </body></html>"#;
        let docs = parse_legal_html(html.as_bytes(), "utf-8", "GG", "DE");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].document_id, "gg_para_art1");
    }

    #[test]
    fn undecodable_bytes_never_fail_the_document() {
        let invalid = vec![0xff, 0xfe, 0x00, b'<', b'h', b'1', b'>', b'x', b'<', b'/', b'h', b'1', b'>'];
        let docs = parse_legal_html(&invalid, "windows-1252", "X", "DE");
        assert!(!docs.is_empty());
    }

    #[test]
    fn norm_id_normalisation_strips_symbols() {
        assert_eq!(normalize_norm_id("§ 433"), "433");
        assert_eq!(normalize_norm_id("Art 1"), "art1");
    }
}
