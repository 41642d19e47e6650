//! Query-string transport for small handoffs.
//!
//! An alternate path to the session store: the same two values, URL-encoded
//! into `image` and `metadata` query parameters. Only viable for tiny
//! payloads, so the builder enforces a hard URL length cap and callers fall
//! back to the store when it trips.

use crate::error::TransportError;
use crate::selection::CapturedArtifact;

/// Longest URL the transport will emit. Beyond this, use the store.
pub const MAX_URL_LENGTH: usize = 2000;

const IMAGE_PARAM: &str = "image";
const METADATA_PARAM: &str = "metadata";

pub fn build_handoff_url(base: &str, artifact: &CapturedArtifact) -> Result<String, TransportError> {
    let url = format!(
        "{base}?{IMAGE_PARAM}={}&{METADATA_PARAM}={}",
        urlencoding::encode(&artifact.encoded_image),
        urlencoding::encode(&artifact.metadata.to_json()),
    );
    if url.len() > MAX_URL_LENGTH {
        return Err(TransportError::UrlTooLong {
            length: url.len(),
            limit: MAX_URL_LENGTH,
        });
    }
    Ok(url)
}

/// Parse a handoff out of a query string, with or without the leading `?`.
pub fn parse_handoff_query(query: &str) -> Result<CapturedArtifact, TransportError> {
    let mut encoded_image = None;
    let mut metadata_json = None;
    for pair in query.trim_start_matches('?').split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let decoded = urlencoding::decode(value)
            .map_err(|err| TransportError::Malformed(format!("{key}: {err}")))?
            .into_owned();
        match key {
            IMAGE_PARAM => encoded_image = Some(decoded),
            METADATA_PARAM => metadata_json = Some(decoded),
            _ => {}
        }
    }

    let encoded_image =
        encoded_image.ok_or_else(|| TransportError::Malformed("missing image".into()))?;
    let metadata_json =
        metadata_json.ok_or_else(|| TransportError::Malformed("missing metadata".into()))?;
    let metadata = serde_json::from_str(&metadata_json)
        .map_err(|err| TransportError::Malformed(format!("metadata: {err}")))?;
    Ok(CapturedArtifact {
        encoded_image,
        metadata,
    })
}
