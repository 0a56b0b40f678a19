//! Media field model and size gating
//!
//! A post's stored media field is either absent, a plain image URL, or a
//! composite `"<pdfRef>|<thumbRef>"` pairing a document reference with a
//! static thumbnail. Historically the PDF side could be an inline base64
//! data URI written straight into the post row, so list responses gate the
//! field by byte length instead of shipping it verbatim.
//!
//! Gating is a read-time projection only; stored rows are never mutated.

/// Byte ceiling for media fields on list/collection responses.
pub const LIST_MEDIA_CEILING: usize = 20_000;

/// Byte ceiling for media fields on detail responses.
pub const DETAIL_MEDIA_CEILING: usize = 2_000_000;

/// Marker substituted for an oversized inline PDF on list responses.
pub const PDF_PLACEHOLDER: &str = "PDF_PLACEHOLDER";

/// Pagination bounds for list endpoints.
pub const DEFAULT_LIST_LIMIT: i64 = 20;
pub const MAX_LIST_LIMIT: i64 = 30;

const PDF_DATA_URI_PREFIX: &str = "data:application/pdf";

/// Parsed form of the stored media field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    None,
    ExternalImage(String),
    PdfDocument { document: String, thumbnail: String },
}

impl Media {
    /// Parse the stored field. At most one `|` is meaningful; a value
    /// without one is never treated as a PDF composite.
    pub fn parse(raw: Option<&str>) -> Media {
        let raw = match raw {
            Some(s) if !s.is_empty() => s,
            _ => return Media::None,
        };
        match raw.split_once('|') {
            Some((document, thumbnail)) => Media::PdfDocument {
                document: document.to_string(),
                thumbnail: thumbnail.to_string(),
            },
            None => Media::ExternalImage(raw.to_string()),
        }
    }

    /// Serialize back to the stored encoding.
    pub fn to_field(&self) -> Option<String> {
        match self {
            Media::None => None,
            Media::ExternalImage(url) => Some(url.clone()),
            Media::PdfDocument {
                document,
                thumbnail,
            } => Some(format!("{}|{}", document, thumbnail)),
        }
    }
}

/// Media projection for a list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatedMedia {
    pub image_url: String,
    /// True iff the raw field was present, independent of whether its
    /// bytes were included. Lets clients tell "no media" from "withheld".
    pub has_media: bool,
}

/// Shape a post's media field for a list/collection response.
///
/// Values over the ceiling are dropped, except an inline-PDF composite,
/// which keeps its thumbnail behind a placeholder marker.
pub fn gate_for_list(raw: Option<&str>) -> GatedMedia {
    let value = match raw {
        Some(s) => s,
        None => {
            return GatedMedia {
                image_url: String::new(),
                has_media: false,
            }
        }
    };

    if value.len() <= LIST_MEDIA_CEILING {
        return GatedMedia {
            image_url: value.to_string(),
            has_media: true,
        };
    }

    if let Media::PdfDocument {
        document,
        thumbnail,
    } = Media::parse(Some(value))
    {
        if document.starts_with(PDF_DATA_URI_PREFIX) {
            return GatedMedia {
                image_url: format!("{}|{}", PDF_PLACEHOLDER, thumbnail),
                has_media: true,
            };
        }
    }

    GatedMedia {
        image_url: String::new(),
        has_media: true,
    }
}

/// Media projection for a detail response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailMedia {
    pub image_url: String,
    pub media_too_large: bool,
}

/// Shape a post's media field for a detail response. The larger ceiling
/// still applies; an oversized field is withheld and flagged rather than
/// truncated.
pub fn gate_for_detail(raw: Option<&str>) -> DetailMedia {
    match raw {
        Some(value) if value.len() > DETAIL_MEDIA_CEILING => DetailMedia {
            image_url: String::new(),
            media_too_large: true,
        },
        Some(value) => DetailMedia {
            image_url: value.to_string(),
            media_too_large: false,
        },
        None => DetailMedia {
            image_url: String::new(),
            media_too_large: false,
        },
    }
}

/// Clamp a caller-supplied list limit to `[1, MAX_LIST_LIMIT]`.
/// Absent, unparseable, zero, or negative values fall back to the default.
pub fn clamp_limit(raw: Option<&str>) -> i64 {
    match raw.and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(n) if n >= 1 => n.min(MAX_LIST_LIMIT),
        _ => DEFAULT_LIST_LIMIT,
    }
}

/// Clamp a caller-supplied list offset; anything unusable becomes 0.
pub fn clamp_offset(raw: Option<&str>) -> i64 {
    match raw.and_then(|s| s.trim().parse::<i64>().ok()) {
        Some(n) if n >= 0 => n,
        _ => 0,
    }
}
