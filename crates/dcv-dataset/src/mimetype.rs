//! Recognized scientific-data mimetypes
//!
//! Static mapping from mimetypes to the file suffixes that carry them. Used
//! to classify resources whose upload did not record a mimetype.

/// Mimetype of RT-DC measurement files
pub const RTDC_MIMETYPE: &str = "application/x-rtdc";

/// Mimetype -> recognized suffixes (lowercase, with leading dot)
pub const DC_MIME_TYPES: &[(&str, &[&str])] = &[(RTDC_MIMETYPE, &[".rtdc"])];

/// Whether `mimetype` is one of the recognized scientific-data mimetypes
#[must_use]
pub fn is_dc_mimetype(mimetype: &str) -> bool {
    DC_MIME_TYPES.iter().any(|(mt, _)| *mt == mimetype)
}

/// Infer a mimetype from the suffix of a file name
///
/// Only the text after the last `.` is considered; names without a dot
/// never match.
#[must_use]
pub fn mimetype_for_name(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    let suffix = format!(".{}", ext.to_ascii_lowercase());
    DC_MIME_TYPES
        .iter()
        .find(|(_, suffixes)| suffixes.contains(&suffix.as_str()))
        .map(|(mt, _)| *mt)
}
