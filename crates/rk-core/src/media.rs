//! Media-domain enums: hash algorithms, derived artifact kinds, genders.
//!
//! All enums serialize in lowercase and implement `Display` manually for a
//! consistent string representation in paths, logs and database columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// HashAlgorithm
// ---------------------------------------------------------------------------

/// Which stored scene hash names the derived artifact directories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// MD5 of the full file contents.
    #[default]
    Md5,
    /// OpenSubtitles-style hash (size + head/tail chunks).
    Oshash,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => write!(f, "md5"),
            Self::Oshash => write!(f, "oshash"),
        }
    }
}

// ---------------------------------------------------------------------------
// ArtifactKind
// ---------------------------------------------------------------------------

/// A derived artifact generated for every (scene, marker offset) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Short H.264 video clip starting at the marker.
    Clip,
    /// Animated WebP preview starting at the marker.
    Preview,
}

impl ArtifactKind {
    /// Every kind, in generation order.
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Clip, ArtifactKind::Preview];

    /// File extension used for this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Clip => "mp4",
            Self::Preview => "webp",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clip => write!(f, "clip"),
            Self::Preview => write!(f, "preview"),
        }
    }
}

// ---------------------------------------------------------------------------
// Gender
// ---------------------------------------------------------------------------

/// Performer gender, stored as an upper-case enum string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    TransgenderMale,
    TransgenderFemale,
    Intersex,
    NonBinary,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "MALE",
            Self::Female => "FEMALE",
            Self::TransgenderMale => "TRANSGENDER_MALE",
            Self::TransgenderFemale => "TRANSGENDER_FEMALE",
            Self::Intersex => "INTERSEX",
            Self::NonBinary => "NON_BINARY",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MALE" => Ok(Self::Male),
            "FEMALE" => Ok(Self::Female),
            "TRANSGENDER_MALE" => Ok(Self::TransgenderMale),
            "TRANSGENDER_FEMALE" => Ok(Self::TransgenderFemale),
            "INTERSEX" => Ok(Self::Intersex),
            "NON_BINARY" => Ok(Self::NonBinary),
            other => Err(crate::Error::Validation(format!("unknown gender: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_extensions() {
        assert_eq!(ArtifactKind::Clip.extension(), "mp4");
        assert_eq!(ArtifactKind::Preview.extension(), "webp");
    }

    #[test]
    fn hash_algorithm_serde() {
        let algo: HashAlgorithm = serde_json::from_str("\"oshash\"").unwrap();
        assert_eq!(algo, HashAlgorithm::Oshash);
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::Md5);
    }

    #[test]
    fn gender_round_trips_through_str() {
        for g in [Gender::Male, Gender::NonBinary, Gender::TransgenderFemale] {
            assert_eq!(g.as_str().parse::<Gender>().unwrap(), g);
        }
        assert!("UNKNOWN".parse::<Gender>().is_err());
    }
}
