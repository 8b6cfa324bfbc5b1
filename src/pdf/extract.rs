//! Text extraction from PDF bytes and file naming for downloaded documents

use lopdf::Document;
use percent_encoding::percent_decode_str;
use tracing::debug;
use url::Url;

use super::error::PdfError;
use crate::crawler::storage::sanitize_file_name;

/// File name used when a URL has no usable last path segment
const FALLBACK_FILE_NAME: &str = "document.pdf";

/// Local file name for a PDF URL
///
/// The last path segment is percent-decoded, given a `.pdf` suffix when it
/// lacks one and sanitized.
pub fn pdf_file_name(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    let decoded = decoded.trim();
    if decoded.is_empty() {
        return FALLBACK_FILE_NAME.to_string();
    }

    let mut name = decoded.to_string();
    if !name.to_lowercase().ends_with(".pdf") {
        name.push_str(".pdf");
    }
    sanitize_file_name(&name)
}

/// Extract the text of every page, tagged with page markers and normalized
///
/// Pages without text are left out. An unreadable page is logged and skipped;
/// only a document that cannot be parsed at all is an error.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, PdfError> {
    let document = Document::load_mem(bytes)
        .map_err(|e| PdfError::Extraction(format!("Failed to parse PDF: {}", e)))?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().into_keys() {
        match document.extract_text(&[page_number]) {
            Ok(text) if !text.trim().is_empty() => {
                pages.push(format!("--- Page {} ---\n{}", page_number, text));
            }
            Ok(_) => {}
            Err(e) => debug!("Skipping page {}: {}", page_number, e),
        }
    }

    Ok(normalize_text(&pages.join("\n\n")))
}

/// Trim lines, collapse whitespace runs and keep single blank lines between paragraphs
pub fn normalize_text(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut pending_blank = false;

    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            pending_blank = !lines.is_empty();
            continue;
        }
        if pending_blank {
            lines.push(String::new());
            pending_blank = false;
        }
        lines.push(line);
    }

    lines.join("\n")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    /// Build an in-memory PDF with one page per entry of `pages`
    pub(crate) fn sample_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
            ];
            if !text.is_empty() {
                operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            }
            operations.push(Operation::new("ET", vec![]));

            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pdf_file_name() {
        let name = |s: &str| pdf_file_name(&Url::parse(s).unwrap());

        assert_eq!(name("https://univ.example/dept/doc.pdf"), "doc.pdf");
        assert_eq!(name("https://univ.example/files/Rules%202024.PDF"), "Rules_2024.PDF");
        assert_eq!(name("https://univ.example/download?id=7"), "download.pdf");
        assert_eq!(name("https://univ.example/files/"), "document.pdf");
        assert_eq!(
            name("https://univ.example/files/akademik%C3%BCr.pdf"),
            "akademik_r.pdf"
        );
    }

    #[test]
    fn test_normalize_text() {
        let raw = "\n\n  --- Page 1 ---\n  Hello    world  \n\n\n\nSecond\tparagraph\n\n";
        assert_eq!(
            normalize_text(raw),
            "--- Page 1 ---\nHello world\n\nSecond paragraph"
        );
    }

    #[test]
    fn test_normalize_never_doubles_blank_lines() {
        let normalized = normalize_text("a\n \n\t\n\nb\n\n\nc");
        assert!(!normalized.contains("\n\n\n"));
        assert_eq!(normalized, "a\n\nb\n\nc");
    }

    #[test]
    fn test_extract_pdf_text_with_page_markers() {
        let bytes = sample_pdf(&["Registration guide", "", "Course catalog"]);
        let text = extract_pdf_text(&bytes).unwrap();

        assert!(text.starts_with("--- Page 1 ---\n"));
        assert!(text.contains("Registration guide"));
        assert!(!text.contains("--- Page 2 ---"));
        assert!(text.contains("--- Page 3 ---"));
        assert!(text.contains("Course catalog"));
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn test_extract_rejects_garbage() {
        assert!(matches!(
            extract_pdf_text(b"this is not a pdf"),
            Err(PdfError::Extraction(_))
        ));
    }
}
