//! Pipeline stages. Each takes the previous stage's output and either hands a
//! validated value to the next one or fails the whole resolution.

use log::{debug, warn};
use url::Url;

use crate::{
    config::{self, DecoderConfig},
    decoder::DecodeRule,
    errors::{ResolveError, ResolveResult},
    extractor::{self, ExtractionRule},
    models::{MediaKind, ResolutionRequest, Stage},
    utils::text,
};

/// What the stage-2 page gave us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageToken {
    /// Obfuscated manifest url, needs decoding.
    Hidden(String),
    /// Plain manifest url from the player config.
    Direct(Url),
}

pub fn parse_url(value: &str) -> ResolveResult<Url> {
    Url::parse(value).map_err(|_| ResolveError::InvalidUrl {
        url: value.to_owned(),
    })
}

pub fn build_entry_url(embed_base: &str, request: &ResolutionRequest) -> ResolveResult<Url> {
    request.validate()?;

    config::parse_base("embed_base", embed_base)?;

    let base = embed_base.trim().trim_end_matches('/');
    let path = match request.kind {
        MediaKind::Movie => "embed/movie",
        MediaKind::Series => "embed/tv",
    };
    let mut url = Url::parse(&format!("{base}/{path}"))
        .map_err(|_| ResolveError::invalid_config("embed_base", embed_base))?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("imdb", &request.subject_id);

        if let (MediaKind::Series, Some(season), Some(episode)) =
            (request.kind, request.season, request.episode)
        {
            query
                .append_pair("season", &season.to_string())
                .append_pair("episode", &episode.to_string());
        }
    }

    Ok(url)
}

/// Player iframe of the entry page. Scheme-relative sources take the relay
/// scheme, anything else relative is resolved against the entry page.
pub fn extract_rcp_url(entry_url: &Url, relay_base: &Url, entry_html: &str) -> ResolveResult<Url> {
    let src = extractor::extract(entry_html, &ExtractionRule::PlayerIframe)?;
    let full = text::to_full_url(&src, relay_base);

    entry_url
        .join(&full)
        .map_err(|_| ResolveError::InvalidUrl { url: src })
}

pub fn extract_prorcp_url(rcp_url: &Url, rcp_html: &str) -> ResolveResult<Url> {
    let path = extractor::extract(rcp_html, &ExtractionRule::ProrcpPath)?;

    rcp_url
        .join(&path)
        .map_err(|_| ResolveError::InvalidUrl { url: path })
}

pub fn extract_token(prorcp_html: &str) -> ResolveResult<PageToken> {
    match extractor::extract(prorcp_html, &ExtractionRule::HiddenToken) {
        Ok(token) => Ok(PageToken::Hidden(token)),
        Err(err) => {
            // older player pages carry the manifest url in plain sight
            match extractor::extract(prorcp_html, &ExtractionRule::FileProperty) {
                Ok(file) if text::is_absolute_http_url(&file) => {
                    debug!("[resolver] no hidden token, using player file property");
                    Ok(PageToken::Direct(parse_url(file.trim())?))
                }
                _ => Err(err),
            }
        }
    }
}

/// Tries the primary rule, then the fallback when the primary fails or does
/// not yield an absolute http(s) url.
pub fn decode_token(decoder: &DecoderConfig, token: &str) -> ResolveResult<Url> {
    let mut last_err = None;

    for rule in decoder.rules() {
        match try_decode(rule, token) {
            Ok(url) => return Ok(url),
            Err(err) => {
                warn!(
                    "[resolver] {} with variant {} failed: {err}",
                    Stage::Decode,
                    rule.variant()
                );
                last_err = Some(err);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        ResolveError::decode(decoder.primary.variant(), "no decoder configured")
    }))
}

fn try_decode(rule: &DecodeRule, token: &str) -> ResolveResult<Url> {
    let plain = rule.decode(token)?;
    let plain = plain.trim();

    if !text::is_absolute_http_url(plain) {
        return Err(ResolveError::decode(
            rule.variant(),
            format!("decoded value is not an absolute url: {plain:?}"),
        ));
    }

    parse_url(plain)
}

pub fn extract_script_url(prorcp_url: &Url, prorcp_html: &str, marker: &str) -> ResolveResult<Url> {
    let src = extractor::extract(prorcp_html, &ExtractionRule::DecoderScript(marker.into()))?;

    prorcp_url
        .join(&src)
        .map_err(|_| ResolveError::extraction(Stage::Script))
}
