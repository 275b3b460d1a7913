pub mod config;
pub mod decoder;
pub mod errors;
pub mod extractor;
pub mod hls;
pub mod models;
pub mod resolver;
pub mod transport;
pub mod utils;

pub use config::{DecoderConfig, ResolverConfig};
pub use decoder::{DecodeRule, DecodeVariant};
pub use errors::{ErrorKind, ResolveError, ResolveResult};
pub use models::{MediaKind, ResolutionRequest, Stage, StreamVariant};
pub use resolver::{Resolver, ScriptSink};
pub use transport::{HttpTransport, Transport};

use tokio_util::sync::CancellationToken;

/// Resolves `request` with a fresh http client and the default hosts.
pub async fn resolve_streams(request: &ResolutionRequest) -> ResolveResult<Vec<StreamVariant>> {
    let config = ResolverConfig::default();
    let embed_base = config.embed_base.clone();
    let resolver = Resolver::new(config).map_err(|err| ResolveError::transport(embed_base, err))?;

    resolver
        .resolve_streams(request, &CancellationToken::new())
        .await
}
