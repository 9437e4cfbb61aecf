use crate::config::FilterConfig;
use crate::error::Result;
use crate::span::Span;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

pub const SIDECAR_AUTH_FILTER_OPERATION_NAME_PATTERN: &str = r"^async\s+ext_authz\s+egress\s+.*$";
pub const ISTIO_MIXER_NAME_PATTERN: &str = r"^istio-mixer$";

static SIDECAR_AUTH_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(SIDECAR_AUTH_FILTER_OPERATION_NAME_PATTERN)
        .case_insensitive(true)
        .build()
        .unwrap()
});
static MIXER_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(ISTIO_MIXER_NAME_PATTERN)
        .case_insensitive(true)
        .build()
        .unwrap()
});

/// Recognizes spans emitted by mesh infrastructure rather than by services,
/// so they never show up as nodes in a dependency diagram.
#[derive(Debug, Clone)]
pub struct SystemSpanFilter {
    sidecar_auth_operation: Regex,
    mixer_service: Regex,
}

impl SystemSpanFilter {
    pub fn new(config: &FilterConfig) -> Result<Self> {
        Ok(Self {
            sidecar_auth_operation: RegexBuilder::new(&config.sidecar_auth_operation_pattern)
                .case_insensitive(true)
                .build()?,
            mixer_service: RegexBuilder::new(&config.mixer_service_pattern)
                .case_insensitive(true)
                .build()?,
        })
    }

    pub fn is_ignored(&self, span: &Span) -> bool {
        self.sidecar_auth_operation.is_match(&span.operation_name)
            || self.mixer_service.is_match(&span.service_name)
    }
}

impl Default for SystemSpanFilter {
    fn default() -> Self {
        Self {
            sidecar_auth_operation: SIDECAR_AUTH_RE.clone(),
            mixer_service: MIXER_RE.clone(),
        }
    }
}
