use thiserror::Error;

use crate::{decoder::DecodeVariant, models::Stage};

/// Everything that can stop a resolution. Each variant carries the url or
/// stage that produced it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },
    #[error("unsupported media kind: {kind:?}")]
    UnsupportedMediaKind { kind: String },
    #[error("request to {url} failed: {cause}")]
    TransportError { url: String, cause: String },
    #[error("HTTP {status} for URL: {url}")]
    UnexpectedStatus { url: String, status: u16 },
    #[error("expected content not found at stage {stage}")]
    ExtractionFailed { stage: Stage },
    #[error("decoder variant {variant} failed: {reason}")]
    DecodeFailed {
        variant: DecodeVariant,
        reason: String,
    },
    #[error("no stream variants found in playlist {base_url}")]
    NoVariantsFound { base_url: String },
    #[error("invalid url: {url:?}")]
    InvalidUrl { url: String },
    #[error("invalid {field} in config: {value:?}")]
    InvalidConfig { field: &'static str, value: String },
    #[error("resolution cancelled at stage {stage}")]
    Cancelled { stage: Stage },
}

/// Coarse grouping a caller can act on: alert someone when the upstream page
/// changed shape, retry later when the failure was transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Transient,
    ShapeChanged,
    Cancelled,
}

impl ResolveError {
    pub fn extraction(stage: Stage) -> Self {
        Self::ExtractionFailed { stage }
    }

    pub fn decode<S: Into<String>>(variant: DecodeVariant, reason: S) -> Self {
        Self::DecodeFailed {
            variant,
            reason: reason.into(),
        }
    }

    pub fn transport<U: Into<String>, C: ToString>(url: U, cause: C) -> Self {
        Self::TransportError {
            url: url.into(),
            cause: cause.to_string(),
        }
    }

    pub fn invalid_request<S: Into<String>>(reason: S) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub fn invalid_config<S: Into<String>>(field: &'static str, value: S) -> Self {
        Self::InvalidConfig {
            field,
            value: value.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::InvalidRequest { .. }
            | ResolveError::UnsupportedMediaKind { .. }
            | ResolveError::InvalidConfig { .. } => ErrorKind::InvalidInput,
            ResolveError::TransportError { .. } | ResolveError::UnexpectedStatus { .. } => {
                ErrorKind::Transient
            }
            ResolveError::ExtractionFailed { .. }
            | ResolveError::DecodeFailed { .. }
            | ResolveError::NoVariantsFound { .. }
            | ResolveError::InvalidUrl { .. } => ErrorKind::ShapeChanged,
            ResolveError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Upstream markup or encoding changed; retrying will not help.
    pub fn is_shape_change(&self) -> bool {
        self.kind() == ErrorKind::ShapeChanged
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ResolveError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;
