use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

pub const PROFILE_DOMAIN: &str = "linkedin.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackend {
    #[default]
    Primary,
    Alternate,
}

impl SourceBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceBackend::Primary => "primary",
            SourceBackend::Alternate => "alternate",
        }
    }
}

impl fmt::Display for SourceBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One organic result as returned by a search backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawResultItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// A link that points into the `linkedin.com/in/` profile namespace.
///
/// Scheme and host are matched case-insensitively, `www.` is optional and the
/// handle segment must be non-empty. The original link text is kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProfileUrl(String);

impl ProfileUrl {
    pub fn parse(link: &str) -> Option<ProfileUrl> {
        let link = link.trim();
        let parsed = Url::parse(link).ok()?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }

        let host = parsed.host_str()?;
        let host = host.strip_prefix("www.").unwrap_or(host);
        if host != PROFILE_DOMAIN {
            return None;
        }

        let mut segments = parsed.path_segments()?;
        match (segments.next(), segments.next()) {
            (Some("in"), Some(handle)) if !handle.is_empty() => Some(ProfileUrl(link.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateProfile {
    pub name: String,
    pub job_title: String,
    pub company: String,
    pub profile_url: ProfileUrl,
    pub snippet: String,
    pub location_hint: Option<String>,
    pub confidence_score: f64,
    pub source_backend: SourceBackend,
}
