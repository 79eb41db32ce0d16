//! Temporary media upload rules and request encoding.
//!
//! Limits per <https://developer.work.weixin.qq.com/document/path/90253>:
//! every file must be larger than 5 bytes; images and videos up to 10 MiB,
//! voice up to 2 MiB, plain files up to 20 MiB.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::wecom::models::MediaType;
use crate::{CoreError, Result};

/// Files must be strictly larger than this many bytes.
pub const MIN_MEDIA_BYTES: usize = 5;

const MIB: usize = 1024 * 1024;

/// Multipart field name expected by the upload endpoint.
pub const UPLOAD_FIELD: &str = "media";

impl MediaType {
    /// Maximum accepted size in bytes.
    #[must_use]
    pub const fn max_bytes(self) -> usize {
        match self {
            Self::Image | Self::Video => 10 * MIB,
            Self::Voice => 2 * MIB,
            Self::File => 20 * MIB,
        }
    }
}

/// Check an upload against the size rules for its media type.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if the file is too small or too large.
pub fn validate_upload(media_type: MediaType, filelength: usize) -> Result<()> {
    if filelength <= MIN_MEDIA_BYTES {
        return Err(CoreError::Validation(format!(
            "media must be larger than {MIN_MEDIA_BYTES} bytes, got {filelength}"
        )));
    }
    let max = media_type.max_bytes();
    if filelength > max {
        return Err(CoreError::Validation(format!(
            "{media_type} must not exceed {} MiB, got {filelength} bytes",
            max / MIB
        )));
    }
    Ok(())
}

/// Append `.html` to a file name unless it already ends with it.
#[must_use]
pub fn html_file_name(name: &str) -> String {
    let stem = name.strip_suffix(".html").unwrap_or(name);
    format!("{stem}.html")
}

/// Generate a multipart boundary unlikely to appear in `content`.
#[must_use]
pub fn new_boundary(content: &[u8]) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let mut boundary = format!("----wecom{nanos:x}{:x}", content.len());
    while contains(content, boundary.as_bytes()) {
        boundary.push('x');
    }
    boundary
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Encode the `multipart/form-data` body of an upload.
///
/// The upload endpoint reads `filelength` from the part's
/// `Content-Disposition`, which generic multipart builders cannot emit.
#[must_use]
pub fn encode_upload_body(
    boundary: &str,
    filename: &str,
    content_type: &str,
    content: &[u8],
) -> Vec<u8> {
    let filename = filename.replace(['"', '\r', '\n'], "_");
    let head = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"{UPLOAD_FIELD}\"; filename=\"{filename}\"; filelength={}\r\n\
         Content-Type: {content_type}\r\n\r\n",
        content.len()
    );
    let tail = format!("\r\n--{boundary}--\r\n");

    let mut body = Vec::with_capacity(head.len() + content.len() + tail.len());
    body.extend_from_slice(head.as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(tail.as_bytes());
    body
}

/// `Content-Type` header value for a multipart body with `boundary`.
#[must_use]
pub fn multipart_content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_files_of_five_bytes_or_less() {
        assert!(validate_upload(MediaType::File, 5).is_err());
        assert!(validate_upload(MediaType::File, 0).is_err());
        assert!(validate_upload(MediaType::File, 6).is_ok());
    }

    #[test]
    fn enforces_per_type_limits() {
        assert!(validate_upload(MediaType::Image, 10 * MIB).is_ok());
        assert!(validate_upload(MediaType::Image, 10 * MIB + 1).is_err());
        assert!(validate_upload(MediaType::Voice, 2 * MIB + 1).is_err());
        assert!(validate_upload(MediaType::Video, 10 * MIB + 1).is_err());
        assert!(validate_upload(MediaType::File, 20 * MIB).is_ok());
        assert!(validate_upload(MediaType::File, 20 * MIB + 1).is_err());
    }

    #[test]
    fn validation_errors_are_local() {
        let err = validate_upload(MediaType::Voice, 3 * MIB).expect_err("too large");
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("voice"));
    }

    #[test]
    fn html_suffix_is_added_once() {
        assert_eq!(html_file_name("report"), "report.html");
        assert_eq!(html_file_name("report.html"), "report.html");
    }

    #[test]
    fn upload_body_carries_filelength_in_disposition() {
        let body = encode_upload_body("XYZ", "notes.txt", "text/plain", b"hello world");
        let text = String::from_utf8(body).expect("utf8");
        assert!(text.starts_with("--XYZ\r\n"));
        assert!(text.contains(
            "Content-Disposition: form-data; name=\"media\"; filename=\"notes.txt\"; filelength=11\r\n"
        ));
        assert!(text.contains("Content-Type: text/plain\r\n\r\nhello world\r\n--XYZ--\r\n"));
    }

    #[test]
    fn boundary_does_not_occur_in_content() {
        let boundary = new_boundary(b"plain bytes");
        assert!(boundary.starts_with("----wecom"));
        assert!(!contains(b"plain bytes", boundary.as_bytes()));
    }
}
