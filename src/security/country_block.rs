use crate::core::state::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maps a request to an ISO 3166-1 alpha-2 country code
pub trait CountryResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<String>;
}

/// Reads the country an edge proxy already resolved, e.g. `CF-IPCountry`
pub struct HeaderCountryResolver {
    header: String,
}

impl HeaderCountryResolver {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into().to_ascii_lowercase(),
        }
    }
}

impl CountryResolver for HeaderCountryResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_uppercase())
            .filter(|v| v.len() == 2 && v.chars().all(|c| c.is_ascii_alphabetic()))
    }
}

#[derive(Debug, Default)]
pub struct CountryBlocklist {
    countries: DashSet<String>,
}

impl CountryBlocklist {
    pub fn new() -> Self {
        Self {
            countries: DashSet::new(),
        }
    }

    pub fn with_blocked_countries(codes: &[String]) -> Self {
        let blocklist = Self::new();

        for code in codes {
            if !blocklist.block(code) {
                warn!(country = %code, "Ignoring invalid country code in config");
            }
        }

        tracing::info!(count = blocklist.len(), "Initialized country blocklist");
        blocklist
    }

    /// Returns false for anything that is not a two-letter code
    pub fn block(&self, code: &str) -> bool {
        let code = code.trim();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return false;
        }
        self.countries.insert(code.to_ascii_uppercase());
        true
    }

    pub fn is_blocked(&self, code: &str) -> bool {
        self.countries.contains(&code.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

/// Refuse requests resolved to a blocked country before any handler runs
pub async fn country_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.blocked_countries.is_empty() || request.uri().path() == "/health" {
        return next.run(request).await;
    }

    if let Some(country) = state.country_resolver.resolve(request.headers()) {
        if state.blocked_countries.is_blocked(&country) {
            debug!(country = %country, path = %request.uri().path(), "Blocked by country");
            return (
                StatusCode::FORBIDDEN,
                "This site is not available in your region",
            )
                .into_response();
        }
    }

    next.run(request).await
}
