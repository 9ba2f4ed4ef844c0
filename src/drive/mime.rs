//! Extension-based MIME type lookup.

/// MIME type for files with an unknown or missing extension.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Fixed mappings the web client relies on; these win over the registry.
const MIME_TABLE: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("txt", "text/plain"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("zip", "application/zip"),
    ("rar", "application/x-rar-compressed"),
    ("mp4", "video/mp4"),
    ("mp3", "audio/mpeg"),
];

/// Lower-cased extension of a file name, if it has one.
pub fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .map(str::to_lowercase)
}

/// MIME type for a file name.
///
/// Looks the extension up in the fixed table first, then in the `mime_guess`
/// registry, and falls back to [`DEFAULT_MIME_TYPE`].
pub fn mime_type_for(file_name: &str) -> &'static str {
    let Some(ext) = extension(file_name) else {
        return DEFAULT_MIME_TYPE;
    };

    MIME_TABLE
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .or_else(|| mime_guess::from_ext(&ext).first_raw())
        .unwrap_or(DEFAULT_MIME_TYPE)
}
