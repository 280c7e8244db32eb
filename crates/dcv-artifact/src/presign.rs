//! Presigned links
//!
//! A presigned link grants time-limited read access to one object without
//! further authorization checks. Links carry the object name, a download
//! filename, the expiry instant and a keyed Blake3 signature over all three.

use crate::hash::ContentHash;
use chrono::{DateTime, Utc};

const KEY_CONTEXT: &str = "dcview 2024 presigned artifact links";

/// Signs and verifies presigned links for one bucket
#[derive(Clone)]
pub struct Presigner {
    endpoint_url: String,
    bucket: String,
    key: [u8; 32],
}

impl std::fmt::Debug for Presigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presigner")
            .field("endpoint_url", &self.endpoint_url)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

/// Fields recovered from a presigned link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedLink {
    /// Object name inside the bucket
    pub object_name: String,
    /// Download filename
    pub filename: String,
    /// Expiry instant (unix seconds)
    pub expires: i64,
}

impl Presigner {
    /// Create a signer for `{endpoint_url}/{bucket}`
    #[must_use]
    pub fn new(endpoint_url: impl Into<String>, bucket: impl Into<String>, secret: &[u8]) -> Self {
        let endpoint_url: String = endpoint_url.into();
        Self {
            endpoint_url: endpoint_url.trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            key: ContentHash::derive_key(KEY_CONTEXT, secret),
        }
    }

    /// Bucket name
    #[inline]
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Unsigned object URL, `{endpoint}/{bucket}/{object_name}`
    #[must_use]
    pub fn object_url(&self, object_name: &str) -> String {
        format!("{}/{}/{}", self.endpoint_url, self.bucket, object_name)
    }

    /// Sign a link valid for `expiration_secs` from now
    #[must_use]
    pub fn sign(&self, object_name: &str, filename: &str, expiration_secs: u64) -> String {
        self.sign_at(object_name, filename, expiration_secs, Utc::now())
    }

    /// Sign a link relative to an explicit `now`
    #[must_use]
    pub fn sign_at(
        &self,
        object_name: &str,
        filename: &str,
        expiration_secs: u64,
        now: DateTime<Utc>,
    ) -> String {
        let expires = now.timestamp().saturating_add(i64::try_from(expiration_secs).unwrap_or(i64::MAX));
        let signature = self.signature(object_name, filename, expires);
        format!(
            "{}?filename={}&expires={}&signature={}",
            self.object_url(object_name),
            urlencoding::encode(filename),
            expires,
            signature
        )
    }

    /// Check a link produced by [`Presigner::sign`]
    ///
    /// Returns the signed fields when the signature matches and the link
    /// has not expired at `now`.
    #[must_use]
    pub fn verify_at(&self, url: &str, now: DateTime<Utc>) -> Option<SignedLink> {
        let prefix = format!("{}/{}/", self.endpoint_url, self.bucket);
        let rest = url.strip_prefix(&prefix)?;
        let (object_name, query) = rest.split_once('?')?;

        let mut filename = None;
        let mut expires = None;
        let mut signature = None;
        for pair in query.split('&') {
            match pair.split_once('=')? {
                ("filename", v) => filename = Some(decode_component(v)?),
                ("expires", v) => expires = v.parse::<i64>().ok(),
                ("signature", v) => signature = v.parse::<ContentHash>().ok(),
                _ => {}
            }
        }
        let (filename, expires, signature) = (filename?, expires?, signature?);

        let expected = self.signature(object_name, &filename, expires);
        if !expected.ct_eq(&signature) || now.timestamp() > expires {
            return None;
        }
        Some(SignedLink {
            object_name: object_name.to_string(),
            filename,
            expires,
        })
    }

    fn signature(&self, object_name: &str, filename: &str, expires: i64) -> ContentHash {
        let mut message = Vec::with_capacity(object_name.len() + filename.len() + 24);
        message.extend_from_slice(object_name.as_bytes());
        message.push(0);
        message.extend_from_slice(filename.as_bytes());
        message.push(0);
        message.extend_from_slice(&expires.to_le_bytes());
        ContentHash::keyed(&self.key, &message)
    }
}

/// Decode a query value, accepting only the canonical encoding [`Presigner::sign`] emits
fn decode_component(value: &str) -> Option<String> {
    let decoded = urlencoding::decode(value).ok()?;
    (urlencoding::encode(&decoded) == value).then(|| decoded.into_owned())
}
