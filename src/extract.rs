//! Document reader: plain-text extraction for the supported file formats.
//!
//! Dispatch is purely on the (case-insensitive) file extension through a
//! fixed lookup table; files with any other extension are filtered out by the
//! corpus loader and never reach [`extract_text`].
//!
//! | Extension | Format | Extraction |
//! |-----------|--------|------------|
//! | `.txt`, `.md` | [`DocumentFormat::PlainText`] | lossy UTF-8, unmodified |
//! | `.pdf` | [`DocumentFormat::Pdf`] | per-page text, failing pages skipped |
//! | `.docx` | [`DocumentFormat::Docx`] | `w:t` runs, one line per paragraph |
//! | `.html`, `.htm` | [`DocumentFormat::Html`] | tags stripped, whitespace collapsed |
//!
//! An unreadable container (not a PDF, not a ZIP) is an [`ExtractError`];
//! the loader skips the file. Content that yields no text is `Ok("")`.

use regex::Regex;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Closed set of readable formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Pdf,
    Docx,
    Html,
}

/// Normalized extension → format.
const FORMATS: &[(&str, DocumentFormat)] = &[
    ("txt", DocumentFormat::PlainText),
    ("md", DocumentFormat::PlainText),
    ("pdf", DocumentFormat::Pdf),
    ("docx", DocumentFormat::Docx),
    ("html", DocumentFormat::Html),
    ("htm", DocumentFormat::Html),
];

impl DocumentFormat {
    /// Resolve the format from a file name or path, ignoring case.
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        FORMATS
            .iter()
            .find(|(candidate, _)| *candidate == ext)
            .map(|(_, format)| *format)
    }
}

/// Whether files at `path` can be read at all.
pub fn is_supported(path: &str) -> bool {
    DocumentFormat::from_path(path).is_some()
}

#[derive(Debug)]
pub enum ExtractError {
    UnsupportedFormat(String),
    Pdf(String),
    Docx(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedFormat(path) => write!(f, "unsupported file type: {}", path),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Docx(e) => write!(f, "DOCX extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract plain text from `bytes`, using `path_hint` to pick the format.
pub fn extract_text(path_hint: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    match DocumentFormat::from_path(path_hint) {
        Some(DocumentFormat::PlainText) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        Some(DocumentFormat::Pdf) => extract_pdf(bytes),
        Some(DocumentFormat::Docx) => extract_docx(bytes),
        Some(DocumentFormat::Html) => Ok(extract_html(&String::from_utf8_lossy(bytes))),
        None => Err(ExtractError::UnsupportedFormat(path_hint.to_string())),
    }
}

// ============ PDF ============

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let pages = doc
        .get_pages()
        .into_keys()
        .map(|page_no| doc.extract_text(&[page_no]));
    Ok(join_pages(pages))
}

/// Join per-page results with newlines; pages that failed or hold no text
/// contribute nothing.
fn join_pages<I, E>(pages: I) -> String
where
    I: IntoIterator<Item = Result<String, E>>,
{
    let parts: Vec<String> = pages
        .into_iter()
        .filter_map(Result::ok)
        .map(|page| page.trim().to_string())
        .filter(|page| !page.is_empty())
        .collect();
    parts.join("\n")
}

// ============ DOCX ============

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    extract_paragraphs(&doc_xml)
}

/// Collect `w:t` text, emitting one line per `w:p` paragraph.
fn extract_paragraphs(xml: &[u8]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                current.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs.join("\n").trim().to_string())
}

// ============ HTML ============

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid regex"));
static NOSCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<noscript\b[^>]*>.*?</noscript\s*>").expect("valid regex"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
// Anything left open after the paired passes runs to the end of the input.
static UNCLOSED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(?:<(?:script|style|noscript)\b|<!--).*").expect("valid regex")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

fn extract_html(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, " ");
    let text = STYLE_RE.replace_all(&text, " ");
    let text = NOSCRIPT_RE.replace_all(&text, " ");
    let text = COMMENT_RE.replace_all(&text, " ");
    let text = UNCLOSED_RE.replace(&text, " ");
    let text = TAG_RE.replace_all(&text, " ");
    let text = decode_entities(&text);
    WS_RE.replace_all(&text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
