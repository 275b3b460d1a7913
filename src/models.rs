use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

use crate::errors::ResolveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Movie,
    #[serde(alias = "tv")]
    #[strum(to_string = "series", serialize = "tv")]
    Series,
}

impl MediaKind {
    /// Parses a caller supplied kind, e.g. from a query string or CLI flag.
    pub fn parse(kind: &str) -> Result<Self, ResolveError> {
        MediaKind::from_str(kind.trim()).map_err(|_| ResolveError::UnsupportedMediaKind {
            kind: kind.to_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    pub subject_id: String,
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
}

impl ResolutionRequest {
    pub fn movie<S: Into<String>>(subject_id: S) -> Self {
        Self {
            subject_id: subject_id.into(),
            kind: MediaKind::Movie,
            season: None,
            episode: None,
        }
    }

    pub fn series<S: Into<String>>(subject_id: S, season: u32, episode: u32) -> Self {
        Self {
            subject_id: subject_id.into(),
            kind: MediaKind::Series,
            season: Some(season),
            episode: Some(episode),
        }
    }

    /// The identifier goes into the entry url as is, so only ascii letters
    /// and digits are accepted. Series requests also need a positive season
    /// and episode.
    pub fn validate(&self) -> Result<(), ResolveError> {
        let id = self.subject_id.as_str();
        if id.is_empty() {
            return Err(ResolveError::invalid_request("subject id is empty"));
        }
        if !id.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(ResolveError::invalid_request(format!(
                "subject id {id:?} must be ascii letters and digits"
            )));
        }

        if self.kind == MediaKind::Series {
            match (self.season, self.episode) {
                (Some(s), Some(e)) if s > 0 && e > 0 => {}
                _ => {
                    return Err(ResolveError::invalid_request(format!(
                        "series {id}: season and episode must be set and positive"
                    )))
                }
            }
        }

        Ok(())
    }
}

/// One quality level of a master playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamVariant {
    pub resolution: String,
    pub bandwidth: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    Entry,
    RcpUrl,
    ProrcpUrl,
    HiddenToken,
    Decode,
    Manifest,
    Script,
}
