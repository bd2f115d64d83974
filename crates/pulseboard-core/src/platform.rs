//! The four external analytics platforms a company can be mapped to.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// One of the four external data sources.
///
/// Stored in the database as its lowercase short code (`ga`, `gsc`, `yt`,
/// `li`) and serialized the same way in API payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Web analytics.
    Ga,
    /// Search console.
    Gsc,
    /// Video platform.
    Yt,
    /// Professional network.
    Li,
}

impl Platform {
    /// All platforms, in canonical display order.
    pub const ALL: [Platform; 4] = [Platform::Ga, Platform::Gsc, Platform::Yt, Platform::Li];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Ga => "ga",
            Platform::Gsc => "gsc",
            Platform::Yt => "yt",
            Platform::Li => "li",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ga" => Ok(Platform::Ga),
            "gsc" => Ok(Platform::Gsc),
            "yt" => Ok(Platform::Yt),
            "li" => Ok(Platform::Li),
            other => Err(CoreError::UnknownPlatform(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for platform in Platform::ALL {
            let parsed: Platform = platform.as_str().parse().expect("parse");
            assert_eq!(parsed, platform);
        }
    }

    #[test]
    fn rejects_unknown_code() {
        assert!("facebook".parse::<Platform>().is_err());
    }

    #[test]
    fn serializes_as_lowercase_code() {
        let json = serde_json::to_string(&Platform::Gsc).expect("serialize");
        assert_eq!(json, "\"gsc\"");
    }
}
