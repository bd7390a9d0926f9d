//! External identity providers (OAuth authorization-code exchange).
//!
//! Providers are registered at startup under their route name
//! (`/auth/oauth/{provider}`). The trait returns boxed futures so that
//! differently-typed providers can share one registry.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::AuthResult;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Profile returned by a provider after a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub email: String,
    pub display_name: String,
}

pub trait IdentityProvider: Send + Sync {
    /// Route name, e.g. `google`.
    fn name(&self) -> &str;

    /// Exchange an authorization code for the user's identity.
    /// Transport failures map to `AuthError::IdentityProvider`.
    fn exchange<'a>(&'a self, code: &'a str) -> BoxFuture<'a, AuthResult<ExternalIdentity>>;
}

#[derive(Clone, Default)]
pub struct IdentityProviders {
    providers: HashMap<String, Arc<dyn IdentityProvider>>,
}

impl IdentityProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn IdentityProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for IdentityProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.providers.keys()).finish()
    }
}

/// `google` -> `Google User`
pub fn provider_company(provider: &str) -> String {
    let mut chars = provider.chars();
    match chars.next() {
        Some(first) => format!("{}{} User", first.to_uppercase(), chars.as_str()),
        None => "User".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_company() {
        assert_eq!(provider_company("google"), "Google User");
        assert_eq!(provider_company("github"), "Github User");
    }
}
