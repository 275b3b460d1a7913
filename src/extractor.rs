use std::sync::OnceLock;

use regex::Regex;

use crate::{
    errors::{ResolveError, ResolveResult},
    models::Stage,
    utils::{
        html::{self, AttrValue, DOMProcessor, TextValue},
        text,
    },
};

pub const DEFAULT_SCRIPT_MARKER: &str = "/sV05kUlNvOdOxvtC/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionRule {
    /// `src` of `iframe#player_iframe`
    PlayerIframe,
    /// `/prorcp/...` path inside an inline script body
    ProrcpPath,
    /// trimmed text of the first `div[style="display:none;"]`
    HiddenToken,
    /// `file: '...'` literal of an inline player config
    FileProperty,
    /// `src` of the first script whose src contains the marker
    DecoderScript(String),
}

impl ExtractionRule {
    pub fn stage(&self) -> Stage {
        match self {
            ExtractionRule::PlayerIframe => Stage::RcpUrl,
            ExtractionRule::ProrcpPath => Stage::ProrcpUrl,
            ExtractionRule::HiddenToken | ExtractionRule::FileProperty => Stage::HiddenToken,
            ExtractionRule::DecoderScript(_) => Stage::Script,
        }
    }
}

pub fn extract(html: &str, rule: &ExtractionRule) -> ResolveResult<String> {
    let value = match rule {
        ExtractionRule::PlayerIframe => {
            html::process_document(html, html::non_empty_attr("iframe#player_iframe", "src").as_ref())
        }
        ExtractionRule::ProrcpPath => extract_prorcp_path(html).map(String::from),
        ExtractionRule::HiddenToken => extract_hidden_token(html),
        ExtractionRule::FileProperty => text::extract_file_property(html).map(String::from),
        ExtractionRule::DecoderScript(marker) => extract_script_src(html, marker),
    };

    value.ok_or_else(|| ResolveError::extraction(rule.stage()))
}

// The path lives inside a <script> body, so this scans raw text, not the DOM.
fn extract_prorcp_path(html: &str) -> Option<&str> {
    static PRORCP_SRC_RE: OnceLock<Regex> = OnceLock::new();
    PRORCP_SRC_RE
        .get_or_init(|| Regex::new(r#"src:\s*'(?<path>/prorcp/[^']+)'"#).unwrap())
        .captures(html)
        .and_then(|m| m.name("path"))
        .map(|m| m.as_str())
}

fn extract_hidden_token(html: &str) -> Option<String> {
    let processor: Box<dyn DOMProcessor<Option<String>>> = TextValue::new()
        .all_nodes()
        .trimmed()
        .in_scope(r#"div[style="display:none;"]"#)
        .map_optional(|token: String| (!token.is_empty()).then_some(token))
        .into();

    html::process_document(html, processor.as_ref())
}

fn extract_script_src(html: &str, marker: &str) -> Option<String> {
    let marker = marker.to_owned();
    let processor: Box<dyn DOMProcessor<Option<String>>> = AttrValue::new("src")
        .itr_scope("script[src]")
        .map(move |sources| sources.into_iter().find(|src| src.contains(&marker)))
        .into();

    html::process_document(html, processor.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMBED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Fight Club</title></head>
<body>
    <div id="the_frame">
        <iframe id="player_iframe" src="//cloudnestra.com/rcp/ZmM5YjQ1" frameborder="0" scrolling="no" allowfullscreen></iframe>
    </div>
</body>
</html>"#;

    const RCP_PAGE: &str = r##"<html><body>
<div id="the_frame"></div>
<script>
    $('#pl_but').click(function() {
        loadIframe();
    });
    function loadIframe(data = 1) {
        $('#the_frame').html("");
        $('#the_frame').attr('style', '');
        $("#the_frame").append($("<iframe/>", { id: "player_iframe", src: '/prorcp/NjY1ZTE3ZjQ2YmQ', frameborder: "0" }));
    }
</script>
</body></html>"##;

    const PRORCP_PAGE: &str = r#"<html><head>
<script src="/sV05kUlNvOdOxvtC/3b1a8c.js?_=1744906950"></script>
<script src="/playerjs/pjs_main.js"></script>
</head><body>
<div id="xTyBxQyGTA" style="display:none;">
    =Qz9Vj4r1Zs
</div>
<div id="player_parent"></div>
</body></html>"#;

    #[test]
    fn should_extract_player_iframe() {
        assert_eq!(
            extract(EMBED_PAGE, &ExtractionRule::PlayerIframe).unwrap(),
            "//cloudnestra.com/rcp/ZmM5YjQ1"
        );
    }

    #[test]
    fn should_fail_without_player_iframe() {
        let html = r#"<iframe id="ad_frame" src="//ads.example/x"></iframe><iframe id="player_iframe" src=""></iframe>"#;
        assert_eq!(
            extract(html, &ExtractionRule::PlayerIframe),
            Err(ResolveError::extraction(Stage::RcpUrl))
        );
    }

    #[test]
    fn should_extract_prorcp_path_from_script_body() {
        assert_eq!(
            extract(RCP_PAGE, &ExtractionRule::ProrcpPath).unwrap(),
            "/prorcp/NjY1ZTE3ZjQ2YmQ"
        );
        assert_eq!(
            extract("src:'/prorcp/abc'", &ExtractionRule::ProrcpPath).unwrap(),
            "/prorcp/abc"
        );
    }

    #[test]
    fn should_fail_without_prorcp_path() {
        assert_eq!(
            extract(EMBED_PAGE, &ExtractionRule::ProrcpPath),
            Err(ResolveError::extraction(Stage::ProrcpUrl))
        );
    }

    #[test]
    fn should_extract_hidden_token() {
        assert_eq!(
            extract(PRORCP_PAGE, &ExtractionRule::HiddenToken).unwrap(),
            "=Qz9Vj4r1Zs"
        );
    }

    #[test]
    fn should_fail_without_hidden_div() {
        let html = r#"<div style="display:none">nearly</div><div style="display: none;">close</div>"#;
        assert_eq!(
            extract(html, &ExtractionRule::HiddenToken),
            Err(ResolveError::extraction(Stage::HiddenToken))
        );
        assert_eq!(
            extract(RCP_PAGE, &ExtractionRule::HiddenToken),
            Err(ResolveError::extraction(Stage::HiddenToken))
        );
    }

    #[test]
    fn should_extract_decoder_script() {
        let rule = ExtractionRule::DecoderScript(DEFAULT_SCRIPT_MARKER.into());
        assert_eq!(
            extract(PRORCP_PAGE, &rule).unwrap(),
            "/sV05kUlNvOdOxvtC/3b1a8c.js?_=1744906950"
        );
        assert_eq!(
            extract(RCP_PAGE, &rule),
            Err(ResolveError::extraction(Stage::Script))
        );
    }

    #[test]
    fn should_extract_file_property() {
        let html = r#"<script>var player = new Playerjs({id:"player_parent", file: 'https://tmstr.example/pl/master.m3u8'});</script>"#;
        assert_eq!(
            extract(html, &ExtractionRule::FileProperty).unwrap(),
            "https://tmstr.example/pl/master.m3u8"
        );
    }
}
