//! Pure checks and naming rules for uploaded posts. Nothing here touches the
//! filesystem.

use super::{IngestError, UploadField};
use regex::Regex;
use std::sync::LazyLock;

pub const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];
pub const MARKDOWN_MIME_TYPES: [&str; 2] = ["text/markdown", "text/x-markdown"];
pub const PLAIN_TEXT_MIME: &str = "text/plain";
/// Accepted image types and the extension each is stored under.
pub const IMAGE_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

const FALLBACK_BASE_NAME: &str = "upload";

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#[ \t]+([^\r\n]+)").expect("valid heading pattern"));

pub fn validate_markdown(original_name: &str, mime_type: Option<&str>) -> Result<(), IngestError> {
    let extension = extension_of(original_name);
    let mime = mime_type.map(normalize_mime);

    let by_extension = extension
        .as_deref()
        .is_some_and(|ext| MARKDOWN_EXTENSIONS.contains(&ext));
    let by_mime = mime
        .as_deref()
        .is_some_and(|mime| MARKDOWN_MIME_TYPES.contains(&mime));
    let plain_without_extension = extension.is_none() && mime.as_deref() == Some(PLAIN_TEXT_MIME);

    if by_extension || by_mime || plain_without_extension {
        Ok(())
    } else {
        Err(IngestError::validation(
            UploadField::Markdown.name(),
            format!("{original_name} is not a markdown file (.md or text/markdown expected)"),
        ))
    }
}

/// Checks the image type and returns the extension to store it under. The
/// extension follows the accepted MIME type, never the client's file name.
pub fn validate_image(
    original_name: &str,
    mime_type: Option<&str>,
) -> Result<&'static str, IngestError> {
    let mime = mime_type.map(normalize_mime).or_else(|| {
        mime_guess::from_path(file_name_of(original_name))
            .first_raw()
            .map(str::to_string)
    });

    IMAGE_TYPES
        .iter()
        .find(|(accepted, _)| mime.as_deref() == Some(*accepted))
        .map(|(_, extension)| *extension)
        .ok_or_else(|| {
            IngestError::validation(
                UploadField::Image.name(),
                format!("{original_name} is not a supported image (JPEG, PNG, GIF or WebP expected)"),
            )
        })
}

/// First `# Title` line, trimmed. Deeper headings (`## ...`) do not count.
pub fn extract_title(content: &str) -> Option<String> {
    HEADING
        .captures_iter(content)
        .filter_map(|captures| captures.get(1))
        .map(|found| found.as_str().trim().to_string())
        .find(|title| !title.is_empty())
}

/// Uploaded filename without directories or its final extension. A bare
/// `.md` has no name left and yields an empty title.
pub fn title_from_filename(original_name: &str) -> String {
    let (stem, _) = split_name(file_name_of(original_name));
    stem.trim().to_string()
}

pub fn resolve_title(content: &str, original_name: &str) -> String {
    extract_title(content).unwrap_or_else(|| title_from_filename(original_name))
}

/// Lowercased base name with every run of non-alphanumeric characters
/// collapsed into a single `-`.
pub fn sanitize_base_name(original_name: &str) -> String {
    let name = file_name_of(original_name);
    let base = name.split('.').next().unwrap_or_default();

    let sanitized = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if sanitized.is_empty() {
        FALLBACK_BASE_NAME.to_string()
    } else {
        sanitized
    }
}

/// `<sanitized-name>-<timestamp-millis>-<suffix>.<extension>`
pub fn generated_file_name(
    original_name: &str,
    extension: &str,
    timestamp_millis: i64,
    suffix: u32,
) -> String {
    format!(
        "{}-{}-{}.{}",
        sanitize_base_name(original_name),
        timestamp_millis,
        suffix,
        extension
    )
}

fn file_name_of(original_name: &str) -> &str {
    original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name)
}

fn extension_of(original_name: &str) -> Option<String> {
    split_name(file_name_of(original_name))
        .1
        .filter(|ext| !ext.is_empty())
        .map(str::to_lowercase)
}

/// Splits at the last dot. A leading-dot name such as `.md` is all extension.
fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(index) => (&name[..index], Some(&name[index + 1..])),
        None => (name, None),
    }
}

fn normalize_mime(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}
