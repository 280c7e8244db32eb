//! Artifact addressing
//!
//! An artifact is addressed by the resource it was derived from and its
//! [`ArtifactKind`]. Object names shard the resource identifier into
//! `first 3 / next 3 / rest` segments for storage-layer distribution.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Kind of derived artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Rendered overview image
    Preview,
    /// Condensed copy of the dataset (produced by an upstream job)
    Condensed,
}

impl ArtifactKind {
    /// Stable name used in object names
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Condensed => "condensed",
        }
    }
}

impl Display for ArtifactKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preview" => Ok(Self::Preview),
            "condensed" => Ok(Self::Condensed),
            other => Err(KeyError::UnknownKind(other.to_string())),
        }
    }
}

/// Minimum identifier length so that every shard is non-empty
const MIN_RESOURCE_ID_LEN: usize = 7;

/// Address of one artifact: `(resource_id, kind)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    resource_id: String,
    kind: ArtifactKind,
}

impl ArtifactKey {
    /// Create a key, validating the resource identifier
    ///
    /// Identifiers must be ASCII alphanumerics or `-` and at least seven
    /// characters long.
    ///
    /// # Errors
    /// Returns [`KeyError::InvalidResourceId`] otherwise
    pub fn new(resource_id: impl Into<String>, kind: ArtifactKind) -> Result<Self, KeyError> {
        let resource_id = resource_id.into();
        let valid = resource_id.len() >= MIN_RESOURCE_ID_LEN
            && resource_id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-');
        if !valid {
            return Err(KeyError::InvalidResourceId(resource_id));
        }
        Ok(Self { resource_id, kind })
    }

    /// Preview artifact for a resource
    ///
    /// # Errors
    /// See [`ArtifactKey::new`]
    pub fn preview(resource_id: impl Into<String>) -> Result<Self, KeyError> {
        Self::new(resource_id, ArtifactKind::Preview)
    }

    /// Resource identifier
    #[inline]
    #[must_use]
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Artifact kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Sharded object name, e.g. `preview/abc/def/0123-...`
    #[must_use]
    pub fn object_name(&self) -> String {
        let rid = &self.resource_id;
        format!("{}/{}/{}/{}", self.kind, &rid[..3], &rid[3..6], &rid[6..])
    }

    /// Parse a sharded object name back into its key
    ///
    /// # Errors
    /// [`KeyError::InvalidObjectName`] when the name does not have four
    /// segments with 3-character shards, or the errors of [`ArtifactKey::new`]
    pub fn from_object_name(object_name: &str) -> Result<Self, KeyError> {
        let invalid = || KeyError::InvalidObjectName(object_name.to_string());
        let mut parts = object_name.splitn(4, '/');
        let (Some(kind), Some(a), Some(b), Some(rest)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if a.len() != 3 || b.len() != 3 || rest.contains('/') {
            return Err(invalid());
        }
        Self::new(format!("{a}{b}{rest}"), kind.parse()?)
    }
}

impl Display for ArtifactKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_id, self.kind)
    }
}

/// Errors building artifact keys
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// Identifier unusable as an object-name component
    #[error("invalid resource id: '{0}'")]
    InvalidResourceId(String),

    /// Unknown artifact kind
    #[error("unknown artifact kind: '{0}'")]
    UnknownKind(String),

    /// Object name not produced by [`ArtifactKey::object_name`]
    #[error("invalid object name: '{0}'")]
    InvalidObjectName(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn object_name_shards_identifier() {
        let key = ArtifactKey::preview("8e2f5d0c-31b4-4a7c-9c55-d1c6d6e0f9aa").unwrap();
        assert_eq!(
            key.object_name(),
            "preview/8e2/f5d/0c-31b4-4a7c-9c55-d1c6d6e0f9aa"
        );
    }

    #[test]
    fn rejects_short_or_unsafe_ids() {
        assert!(ArtifactKey::preview("abc").is_err());
        assert!(ArtifactKey::preview("../../etc/passwd").is_err());
        assert!(ArtifactKey::preview("abcdefg").is_ok());
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [ArtifactKind::Preview, ArtifactKind::Condensed] {
            assert_eq!(kind.as_str().parse::<ArtifactKind>().unwrap(), kind);
        }
        assert!("thumbnail".parse::<ArtifactKind>().is_err());
    }

    #[test]
    fn object_name_parses_back() {
        let key = ArtifactKey::preview("8e2f5d0c-31b4").unwrap();
        assert_eq!(ArtifactKey::from_object_name(&key.object_name()).unwrap(), key);
        assert!(matches!(
            ArtifactKey::from_object_name("preview/8e2/f5d"),
            Err(KeyError::InvalidObjectName(_))
        ));
        assert!(ArtifactKey::from_object_name("preview/8e2/f5d/0c/../x").is_err());
        assert!(ArtifactKey::from_object_name("thumbnail/8e2/f5d/0c-31b4").is_err());
    }

    proptest! {
        #[test]
        fn object_name_reassembles_identifier(rid in "[a-z0-9-]{7,40}") {
            let key = ArtifactKey::preview(rid.clone()).unwrap();
            let name = key.object_name();
            let rest: String = name.split('/').skip(1).collect();
            prop_assert_eq!(rest, rid);
        }
    }
}
