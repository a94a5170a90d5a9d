//! Checksum and image payload helpers shared by the mutation layer.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use md5::{Digest, Md5};

use crate::{Error, Result};

/// MD5 hex digest of a string. Performer checksums are derived from the
/// name rather than from any image content.
pub fn md5_from_string(s: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}

/// Decode an image supplied as base64, either bare or as a data URI
/// (`data:image/png;base64,...`).
///
/// Returns the declared MIME type (if a data URI was given) and the raw
/// bytes.
pub fn decode_base64_image(input: &str) -> Result<(Option<String>, Vec<u8>)> {
    let input = input.trim();

    let (mime, payload) = match input.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| Error::Validation("malformed data URI: missing ','".into()))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| Error::Validation("data URI is not base64 encoded".into()))?;
            let mime = (!mime.is_empty()).then(|| mime.to_string());
            (mime, payload)
        }
        None => (None, input),
    };

    let data = STANDARD
        .decode(payload)
        .map_err(|e| Error::Validation(format!("invalid base64 image: {e}")))?;

    Ok((mime, data))
}
