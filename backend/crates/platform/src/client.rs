//! Client identification utilities
//!
//! Resolves the client network address used as the rate-limit and audit
//! key, and pulls bearer tokens out of the `Authorization` header.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, header};

/// Key used when no address can be determined (e.g. in-process requests).
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Request extension telling extractors whether `X-Forwarded-For` may be
/// trusted. Installed once at the application root; absent means `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrustedProxy(pub bool);

/// Extract client IP address from headers
///
/// `X-Forwarded-For` is only honoured when the service runs behind a
/// trusted reverse proxy; otherwise any client could pick its own key.
pub fn extract_client_ip(
    headers: &HeaderMap,
    direct_ip: Option<IpAddr>,
    trust_proxy: bool,
) -> Option<IpAddr> {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|xff| xff.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok());
        if forwarded.is_some() {
            return forwarded;
        }
    }
    direct_ip
}

/// Client address from request headers and extensions, using the
/// connection info axum records under `into_make_service_with_connect_info`.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<IpAddr> {
    let trust_proxy = extensions.get::<TrustedProxy>().is_some_and(|t| t.0);
    let direct = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    extract_client_ip(headers, direct, trust_proxy)
}

pub fn client_key(ip: Option<IpAddr>) -> String {
    ip.map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Extractor for the resolved client address. Never rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddress(pub Option<IpAddr>);

impl ClientAddress {
    pub fn to_audit_string(&self) -> Option<String> {
        self.0.map(|ip| ip.to_string())
    }
}

impl<S> FromRequestParts<S> for ClientAddress
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(client_ip(&parts.headers, &parts.extensions)))
    }
}

/// `Authorization: Bearer <token>`; the scheme is matched case-insensitively.
/// An empty token counts as absent.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
