//! Document delivery subsystem
//!
//! PDF bytes live in a relational BLOB column and are streamed to clients
//! in fixed 1 MiB windows, writing through to a local disk cache so repeat
//! requests never touch the database.

mod cache;
mod ingest;
mod stream;

pub use cache::{CacheWriter, DeliveryCache};
pub use ingest::{
    Accepted, DataUriImage, FilePart, Ingestor, PdfUpload, UploadKind, MAX_IMAGE_BYTES,
    MAX_PDF_BYTES,
};
pub use stream::{cached_file_stream, document_stream, sanitize_disposition_filename};
