// Application state (AppState)

use crate::api::textgen::TextGenerator;
use crate::core::config::Config;
use crate::security::country_block::{CountryBlocklist, CountryResolver, HeaderCountryResolver};
use crate::security::gate::AuthGate;
use crate::services::{accounts::AccountService, content::ContentService, users::UserAdminService};
use crate::session::store::SessionRegistry;
use crate::stores::{ContentStore, CredentialStore};
use std::sync::Arc;

/// Shared application state
///
/// Built once at startup and handed to every handler behind an `Arc`.
/// Stores are only reachable through the services and the gate.
#[derive(Clone)]
pub struct AppState {
    /// Server-side session records behind the cookie layer
    pub sessions: SessionRegistry,

    pub gate: AuthGate,

    pub accounts: AccountService,
    pub content: ContentService,
    pub users: UserAdminService,

    /// Text generation backend, absent when `[ai]` is not configured
    pub generator: Option<Arc<dyn TextGenerator>>,

    pub blocked_countries: Arc<CountryBlocklist>,
    pub country_resolver: Arc<dyn CountryResolver>,

    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        credentials: Arc<dyn CredentialStore>,
        content: Arc<dyn ContentStore>,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        let config = Arc::new(config);

        let sessions = SessionRegistry::new();
        let gate = AuthGate::new(Arc::clone(&credentials));

        let blocked_countries = Arc::new(CountryBlocklist::with_blocked_countries(
            &config.security.blocked_countries,
        ));
        let country_resolver: Arc<dyn CountryResolver> =
            Arc::new(HeaderCountryResolver::new(config.security.country_header.clone()));

        Self {
            accounts: AccountService::new(Arc::clone(&credentials), sessions.clone()),
            content: ContentService::new(content),
            users: UserAdminService::new(credentials, sessions.clone()),
            sessions,
            gate,
            generator,
            blocked_countries,
            country_resolver,
            config,
        }
    }
}
