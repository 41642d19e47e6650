//! Session-scoped handoff storage.
//!
//! The capture pipeline and the contact workflow share nothing but two
//! well-known keys in a session-lifetime store. [`SessionStore`] is the
//! quota-bounded KV underneath; [`HandoffStore`] manages the image/metadata
//! pair as one unit so a reader can never observe half a handoff.

use std::collections::BTreeMap;

use log::warn;

use crate::capture::{recompress_artifact, CaptureOptions};
use crate::error::{CaptureError, QuotaExceeded};
use crate::selection::{CapturedArtifact, SelectionMetadata};

pub const IMAGE_KEY: &str = "partRequestImage";
pub const METADATA_KEY: &str = "partRequestMetadata";

/// Default byte budget, matching common browser session-storage quotas.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Quota-bounded string KV with session lifetime. Usage is counted as key
/// plus value length; replacing a key frees its old bytes first.
#[derive(Debug)]
pub struct SessionStore {
    entries: BTreeMap<String, String>,
    quota_bytes: usize,
}

impl SessionStore {
    pub fn new(quota_bytes: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            quota_bytes,
        }
    }

    pub fn with_default_quota() -> Self {
        Self::new(DEFAULT_QUOTA_BYTES)
    }

    pub fn quota_bytes(&self) -> usize {
        self.quota_bytes
    }

    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<(), QuotaExceeded> {
        let freed = self.entries.get(key).map_or(0, |old| key.len() + old.len());
        let projected = self.used_bytes() - freed + key.len() + value.len();
        if projected > self.quota_bytes {
            return Err(QuotaExceeded {
                needed: projected,
                available: self.quota_bytes,
            });
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A handoff read back out of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRequest {
    pub encoded_image: String,
    pub metadata: SelectionMetadata,
}

/// The two handoff keys, managed atomically. A new write replaces any
/// previous pair; a failed write leaves neither key behind.
#[derive(Debug)]
pub struct HandoffStore {
    session: SessionStore,
}

impl HandoffStore {
    pub fn new(session: SessionStore) -> Self {
        Self { session }
    }

    pub fn with_default_quota() -> Self {
        Self::new(SessionStore::with_default_quota())
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionStore {
        &mut self.session
    }

    pub fn write(&mut self, artifact: &CapturedArtifact) -> Result<(), QuotaExceeded> {
        let metadata_json = artifact.metadata.to_json();
        self.clear();
        self.session.set(IMAGE_KEY, artifact.encoded_image.clone())?;
        if let Err(err) = self.session.set(METADATA_KEY, metadata_json) {
            // never leave a half pair behind
            self.session.remove(IMAGE_KEY);
            return Err(err);
        }
        Ok(())
    }

    /// The pending handoff, if a complete and well-formed pair is present.
    /// A half pair or corrupt metadata reads as absent.
    pub fn read(&self) -> Option<StoredRequest> {
        let encoded_image = self.session.get(IMAGE_KEY)?;
        let metadata_json = self.session.get(METADATA_KEY)?;
        let metadata = serde_json::from_str(metadata_json).ok()?;
        Some(StoredRequest {
            encoded_image: encoded_image.to_string(),
            metadata,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.read().is_some()
    }

    /// Consume the pending handoff, removing both keys.
    pub fn take(&mut self) -> Option<StoredRequest> {
        let request = self.read();
        self.clear();
        request
    }

    pub fn clear(&mut self) {
        self.session.remove(IMAGE_KEY);
        self.session.remove(METADATA_KEY);
    }
}

/// How an artifact reached the contact workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Written to the handoff store for the workflow to pick up.
    Stored,
    /// The store would not take it even recompressed; the artifact goes
    /// straight back to the caller instead of being dropped.
    Direct(CapturedArtifact),
}

/// Store-with-fallback: try the store, recompress once on a quota failure,
/// then hand the artifact directly to the caller.
pub fn deliver(
    artifact: CapturedArtifact,
    store: &mut HandoffStore,
    opts: &CaptureOptions,
) -> Result<Delivery, CaptureError> {
    let first = match store.write(&artifact) {
        Ok(()) => return Ok(Delivery::Stored),
        Err(err) => err,
    };
    warn!("handoff store rejected artifact ({first}); recompressing once");
    let reduced = recompress_artifact(&artifact, opts)?;
    match store.write(&reduced) {
        Ok(()) => Ok(Delivery::Stored),
        Err(second) => {
            warn!("handoff store rejected recompressed artifact ({second}); direct hand-off");
            Ok(Delivery::Direct(reduced))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{capture, CaptureRequest, CaptureSubject};
    use crate::geometry::NaturalPoint;
    use crate::selection::{Selection, SelectionMethod};
    use crate::source::SourceImage;
    use image::{Rgba, RgbaImage};

    fn small_artifact(label: &str) -> CapturedArtifact {
        CapturedArtifact {
            encoded_image: format!("data:image/jpeg;base64,{label}"),
            metadata: SelectionMetadata {
                product_name: None,
                selection: Some(Selection::point(NaturalPoint::new(5.0, 5.0))),
                timestamp: "2025-03-14T09:26:53Z".into(),
                source_path: label.into(),
                selection_method: SelectionMethod::TapPoint,
                is_fallback_render: false,
                is_compressed: false,
            },
        }
    }

    fn real_artifact(side: u32) -> CapturedArtifact {
        let pixels = RgbaImage::from_fn(side, side, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8, 255])
        });
        let source = SourceImage::from_pixels(pixels);
        let request = CaptureRequest {
            subject: CaptureSubject::Marked(Selection::point(NaturalPoint::new(
                f64::from(side) / 2.0,
                f64::from(side) / 2.0,
            ))),
            method: SelectionMethod::TapPoint,
            product_name: None,
            source_path: "photo.jpg".into(),
        };
        capture(&source, &request, &CaptureOptions::default()).unwrap()
    }

    #[test]
    fn set_counts_keys_and_values_against_the_quota() {
        let mut store = SessionStore::new(20);
        store.set("abc", "0123456789".into()).unwrap();
        assert_eq!(store.used_bytes(), 13);
        let err = store.set("xyz", "0123456".into()).unwrap_err();
        assert_eq!(err.available, 20);
        // the failed set stored nothing
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn replacing_a_key_frees_its_old_bytes() {
        let mut store = SessionStore::new(16);
        store.set("k", "aaaaaaaaaa".into()).unwrap();
        // 1 + 12 fits only because the old 1 + 10 is released first
        store.set("k", "bbbbbbbbbbbb".into()).unwrap();
        assert_eq!(store.get("k"), Some("bbbbbbbbbbbb"));
        assert_eq!(store.used_bytes(), 13);
    }

    #[test]
    fn write_then_read_round_trips_the_pair() {
        let mut store = HandoffStore::with_default_quota();
        let artifact = small_artifact("AAAA");
        store.write(&artifact).unwrap();

        assert!(store.is_pending());
        let back = store.read().unwrap();
        assert_eq!(back.encoded_image, artifact.encoded_image);
        assert_eq!(back.metadata, artifact.metadata);
    }

    #[test]
    fn a_second_write_replaces_the_first() {
        let mut store = HandoffStore::with_default_quota();
        store.write(&small_artifact("AAAA")).unwrap();
        store.write(&small_artifact("BBBB")).unwrap();
        assert_eq!(store.session().len(), 2);
        assert_eq!(store.read().unwrap().metadata.source_path, "BBBB");
    }

    #[test]
    fn failed_write_leaves_no_half_pair() {
        // room for the image but not the metadata
        let image_len = IMAGE_KEY.len() + small_artifact("AAAA").encoded_image.len();
        let mut store = HandoffStore::new(SessionStore::new(image_len + 10));
        assert!(store.write(&small_artifact("AAAA")).is_err());
        assert!(store.session().is_empty());
        assert!(!store.is_pending());
    }

    #[test]
    fn half_pair_reads_as_absent() {
        let mut store = HandoffStore::with_default_quota();
        store
            .session_mut()
            .set(IMAGE_KEY, "data:image/jpeg;base64,AAAA".into())
            .unwrap();
        assert!(store.read().is_none());
        assert!(!store.is_pending());
    }

    #[test]
    fn corrupt_metadata_reads_as_absent() {
        let mut store = HandoffStore::with_default_quota();
        store.write(&small_artifact("AAAA")).unwrap();
        store
            .session_mut()
            .set(METADATA_KEY, "{not json".into())
            .unwrap();
        assert!(store.read().is_none());
    }

    #[test]
    fn take_consumes_the_pair() {
        let mut store = HandoffStore::with_default_quota();
        store.write(&small_artifact("AAAA")).unwrap();
        assert!(store.take().is_some());
        assert!(store.session().is_empty());
        assert!(store.take().is_none());
    }

    #[test]
    fn deliver_stores_when_the_artifact_fits() {
        let mut store = HandoffStore::with_default_quota();
        let outcome = deliver(real_artifact(64), &mut store, &CaptureOptions::default()).unwrap();
        assert_eq!(outcome, Delivery::Stored);
        assert!(store.is_pending());
        let stored = store.read().unwrap();
        assert!(!stored.metadata.is_compressed);
    }

    #[test]
    fn deliver_recompresses_once_when_the_store_is_tight() {
        let artifact = real_artifact(512);
        let opts = CaptureOptions {
            retry_max_dimension: 32,
            retry_quality: 30,
            ..CaptureOptions::default()
        };
        // quota below the full artifact but roomy for the 32px re-encode
        let quota = artifact.encoded_image.len() - 1;
        let mut store = HandoffStore::new(SessionStore::new(quota));
        let outcome = deliver(artifact, &mut store, &opts).unwrap();

        assert_eq!(outcome, Delivery::Stored);
        let stored = store.read().unwrap();
        assert!(stored.metadata.is_compressed);
    }

    #[test]
    fn deliver_hands_back_directly_when_nothing_fits() {
        let mut store = HandoffStore::new(SessionStore::new(64));
        let outcome =
            deliver(real_artifact(256), &mut store, &CaptureOptions::default()).unwrap();
        match outcome {
            Delivery::Direct(artifact) => {
                assert!(artifact.metadata.is_compressed);
                assert!(artifact
                    .encoded_image
                    .starts_with("data:image/jpeg;base64,"));
            }
            other => panic!("expected direct delivery, got {other:?}"),
        }
        assert!(store.session().is_empty());
        assert!(!store.is_pending());
    }
}
