mod stages;

pub use stages::{
    build_entry_url, decode_token, extract_prorcp_url, extract_rcp_url, extract_script_url,
    extract_token, PageToken,
};

use std::sync::Arc;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    config::ResolverConfig,
    errors::{ResolveError, ResolveResult},
    hls,
    models::{ResolutionRequest, Stage, StreamVariant},
    transport::{HttpTransport, Transport},
    utils::text,
};

/// Receives the stage-2 decoder script for offline inspection. Errors are
/// logged and otherwise ignored.
///
/// `persist` runs on tokio's blocking pool, so it may write to disk. It is
/// called after the manifest url is settled and is not awaited past
/// `ResolverConfig::script_timeout`.
pub trait ScriptSink: Sync + Send {
    fn persist(&self, script_url: &Url, body: &[u8]) -> anyhow::Result<()>;
}

/// Runs the embed → rcp → prorcp → manifest chain for one request at a time.
/// Each instance owns its transport, so concurrent resolutions never share
/// client state.
pub struct Resolver<T: Transport> {
    transport: T,
    config: ResolverConfig,
    script_sink: Option<Arc<dyn ScriptSink>>,
}

impl Resolver<HttpTransport> {
    pub fn new(config: ResolverConfig) -> reqwest::Result<Self> {
        let transport = HttpTransport::new(config.timeout())?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: Transport> Resolver<T> {
    pub fn with_transport(transport: T, config: ResolverConfig) -> Self {
        Self {
            transport,
            config,
            script_sink: None,
        }
    }

    pub fn with_script_sink<S: ScriptSink + 'static>(mut self, sink: S) -> Self {
        self.script_sink = Some(Arc::new(sink));
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Full pipeline: manifest url, then its variants.
    pub async fn resolve_streams(
        &self,
        request: &ResolutionRequest,
        cancel: &CancellationToken,
    ) -> ResolveResult<Vec<StreamVariant>> {
        let manifest_url = self.resolve_manifest_url(request, cancel).await?;

        info!("[resolver] fetching master playlist {manifest_url}");
        let playlist = self
            .fetch_page(Stage::Manifest, &manifest_url, None, cancel)
            .await?;

        let variants = hls::parse_master_playlist(&playlist, manifest_url.as_str())?;
        info!("[resolver] found {} stream variants", variants.len());

        Ok(variants)
    }

    pub async fn resolve_manifest_url(
        &self,
        request: &ResolutionRequest,
        cancel: &CancellationToken,
    ) -> ResolveResult<Url> {
        let relay_base = self.config.relay_url()?;

        let entry_url = stages::build_entry_url(&self.config.embed_base, request)?;
        info!("[resolver] entry url: {entry_url}");
        let entry_html = self.fetch_page(Stage::Entry, &entry_url, None, cancel).await?;

        let rcp_url = stages::extract_rcp_url(&entry_url, &relay_base, &entry_html)?;
        info!("[resolver] rcp url: {rcp_url}");
        let rcp_html = self.fetch_page(Stage::RcpUrl, &rcp_url, None, cancel).await?;

        let prorcp_url = stages::extract_prorcp_url(&rcp_url, &rcp_html)?;
        info!("[resolver] prorcp url: {prorcp_url}");

        // prorcp pages come back empty without the rcp origin as referer
        let referer = text::origin_of(&rcp_url);
        let prorcp_html = self
            .fetch_page(Stage::ProrcpUrl, &prorcp_url, Some(referer.as_str()), cancel)
            .await?;

        let manifest_url = self.settle_manifest_url(&prorcp_html);

        // bounded, and runs whether or not decoding succeeded
        self.persist_script(&prorcp_url, &prorcp_html, &referer, cancel)
            .await;

        let manifest_url = manifest_url?;
        info!("[resolver] manifest url: {manifest_url}");

        Ok(manifest_url)
    }

    fn settle_manifest_url(&self, prorcp_html: &str) -> ResolveResult<Url> {
        match stages::extract_token(prorcp_html)? {
            PageToken::Hidden(token) => {
                debug!("[resolver] hidden token length: {}", token.len());
                stages::decode_token(&self.config.decoder, &token)
            }
            PageToken::Direct(url) => Ok(url),
        }
    }

    async fn fetch_page(
        &self,
        stage: Stage,
        url: &Url,
        referer: Option<&str>,
        cancel: &CancellationToken,
    ) -> ResolveResult<String> {
        let body = self.fetch(stage, url, referer, cancel).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    // dropping the transport future aborts the in-flight request
    async fn fetch(
        &self,
        stage: Stage,
        url: &Url,
        referer: Option<&str>,
        cancel: &CancellationToken,
    ) -> ResolveResult<Vec<u8>> {
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled { stage });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("[resolver] cancelled while fetching {url}");
                Err(ResolveError::Cancelled { stage })
            }
            res = self.transport.fetch(url.as_str(), referer) => res,
        }
    }

    async fn persist_script(
        &self,
        prorcp_url: &Url,
        prorcp_html: &str,
        referer: &str,
        cancel: &CancellationToken,
    ) {
        let sink = match &self.script_sink {
            Some(sink) => sink.clone(),
            None => return,
        };

        let script_url =
            match stages::extract_script_url(prorcp_url, prorcp_html, &self.config.script_marker) {
                Ok(url) => url,
                Err(_) => {
                    info!(
                        "[resolver] no script containing {} found",
                        self.config.script_marker
                    );
                    return;
                }
            };

        let bound = self.config.script_timeout();
        let persisted = tokio::time::timeout(
            bound,
            self.fetch_and_persist(sink, script_url.clone(), referer, cancel),
        )
        .await;

        if persisted.is_err() {
            warn!("[resolver] gave up on script {script_url} after {bound:?}");
        }
    }

    async fn fetch_and_persist(
        &self,
        sink: Arc<dyn ScriptSink>,
        script_url: Url,
        referer: &str,
        cancel: &CancellationToken,
    ) {
        let body = match self
            .fetch(Stage::Script, &script_url, Some(referer), cancel)
            .await
        {
            Ok(body) => body,
            Err(err) => {
                warn!("[resolver] failed to fetch script {script_url}: {err}");
                return;
            }
        };

        let persisted = tokio::task::spawn_blocking(move || {
            let res = sink.persist(&script_url, &body);
            (script_url, res)
        })
        .await;

        match persisted {
            Ok((script_url, Ok(()))) => debug!("[resolver] persisted script {script_url}"),
            Ok((script_url, Err(err))) => {
                warn!("[resolver] failed to persist script {script_url}: {err:#}")
            }
            Err(err) => warn!("[resolver] script sink task failed: {err}"),
        }
    }
}
