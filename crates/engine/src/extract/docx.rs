//! DOCX text: the `w:t` runs of `word/document.xml`, one line per paragraph.

use std::io::{Cursor, Read};

/// Extract paragraph text from a DOCX archive.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| format!("Failed to open DOCX archive: {}", e))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| format!("DOCX has no document body: {}", e))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("Failed to read document.xml: {}", e))?;

    Ok(paragraph_text(&xml))
}

/// Walk the document XML collecting run text.
///
/// Paragraphs are joined with `\n`, `w:tab` becomes `\t` and `w:br` a line
/// break. Empty paragraphs still contribute their separator.
pub fn paragraph_text(xml: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut chars = xml.chars();

    while let Some(c) = chars.next() {
        if c != '<' {
            if in_text {
                current.get_or_insert_with(String::new).push(c);
            }
            continue;
        }

        let mut tag = String::new();
        for tc in chars.by_ref() {
            if tc == '>' {
                break;
            }
            tag.push(tc);
        }

        let closing = tag.starts_with('/');
        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_start_matches('/')
            .split(|ch: char| ch.is_whitespace() || ch == '/')
            .next()
            .unwrap_or_default();

        match (name, closing) {
            ("w:p", false) => {
                if let Some(done) = current.take() {
                    paragraphs.push(done);
                }
                if self_closing {
                    paragraphs.push(String::new());
                } else {
                    current = Some(String::new());
                }
            }
            ("w:p", true) => {
                paragraphs.push(current.take().unwrap_or_default());
            }
            ("w:t", false) => in_text = !self_closing,
            ("w:t", true) => in_text = false,
            ("w:tab", false) => current.get_or_insert_with(String::new).push('\t'),
            ("w:br", false) | ("w:cr", false) => {
                current.get_or_insert_with(String::new).push('\n')
            }
            _ => {}
        }
    }

    if let Some(rest) = current {
        paragraphs.push(rest);
    }

    decode_entities(&paragraphs.join("\n"))
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
