pub mod result;

pub use result::{
    iso_timestamp, preview, spread, FileInfo, IngestError, StoredResult, Submission, UploadedFile,
    FILE_FIELD, PAYLOAD_FIELD, PREVIEW_CHARS, RESERVED_FIELDS,
};
