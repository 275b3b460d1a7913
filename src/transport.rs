use std::time::Duration;

use futures::future::BoxFuture;
use log::debug;
use reqwest::{header, Client};

use crate::{
    errors::{ResolveError, ResolveResult},
    utils,
};

/// Single GET with an optional `Referer`. Implementations must fail on any
/// non-2xx status and never retry.
pub trait Transport: Sync + Send {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        referer: Option<&'a str>,
    ) -> BoxFuture<'a, ResolveResult<Vec<u8>>>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = utils::create_client_builder(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str, referer: Option<&str>) -> ResolveResult<Vec<u8>> {
        debug!("[transport] GET {url} (referer: {referer:?})");

        let mut request = self.client.get(url);
        if let Some(referer) = referer.filter(|r| !r.is_empty()) {
            request = request.header(header::REFERER, referer);
        }

        let response = request
            .send()
            .await
            .map_err(|err| ResolveError::transport(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::UnexpectedStatus {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| ResolveError::transport(url, err))?;

        Ok(body.to_vec())
    }
}

impl Transport for HttpTransport {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        referer: Option<&'a str>,
    ) -> BoxFuture<'a, ResolveResult<Vec<u8>>> {
        Box::pin(self.get(url, referer))
    }
}
