use indexmap::IndexMap;
use log::{debug, warn};
use url::Url;

use crate::{
    errors::{ResolveError, ResolveResult},
    models::StreamVariant,
};

const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF";

/// Parses an HLS master playlist into its variant streams, in playlist order.
/// Variant uris are resolved against `base_url`.
pub fn parse_master_playlist(content: &str, base_url: &str) -> ResolveResult<Vec<StreamVariant>> {
    let base = Url::parse(base_url).map_err(|_| ResolveError::InvalidUrl {
        url: base_url.to_owned(),
    })?;

    let mut variants = Vec::new();
    let mut lines = content.lines().map(str::trim).peekable();

    while let Some(line) = lines.next() {
        if !line.starts_with(STREAM_INF_TAG) {
            continue;
        }

        let attrs = parse_attributes(line);

        // skip blank lines between the tag and its uri
        while lines.peek().is_some_and(|next| next.is_empty()) {
            lines.next();
        }

        let uri = match lines.peek() {
            Some(next) if !next.starts_with('#') => *next,
            _ => {
                debug!("[hls] stream-inf without uri: {line}");
                continue;
            }
        };
        lines.next();

        let url = match base.join(uri) {
            Ok(url) => url,
            Err(err) => {
                warn!("[hls] unresolvable variant uri {uri:?}: {err}");
                continue;
            }
        };

        let variant = StreamVariant {
            resolution: attrs.get("RESOLUTION").cloned().unwrap_or_default(),
            bandwidth: attrs.get("BANDWIDTH").cloned().unwrap_or_default(),
            url: url.to_string(),
        };
        debug!(
            "[hls] variant resolution={:?} bandwidth={:?}",
            variant.resolution, variant.bandwidth
        );
        variants.push(variant);
    }

    if variants.is_empty() {
        return Err(ResolveError::NoVariantsFound {
            base_url: base_url.to_owned(),
        });
    }

    Ok(variants)
}

/// `KEY=VALUE` pairs after the tag's colon. Commas inside quoted values do
/// not split, surrounding quotes are stripped.
pub fn parse_attributes(line: &str) -> IndexMap<String, String> {
    let list = line.split_once(':').map(|(_, rest)| rest).unwrap_or_default();

    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (idx, ch) in list.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&list[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);

    parts
        .into_iter()
        .filter_map(|part| part.split_once('='))
        .map(|(key, value)| {
            (
                key.trim().to_owned(),
                value.trim().trim_matches('"').to_owned(),
            )
        })
        .collect()
}
