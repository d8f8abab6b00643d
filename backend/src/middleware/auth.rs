use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use crate::config::Config;
use crate::error::RewardsError;
use crate::AppState;

/// Identity asserted by the provider in front of the service.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub email: String,
    pub name: Option<String>,
}

pub fn principal_from_headers(headers: &HeaderMap, config: &Config) -> Option<Principal> {
    let email = headers
        .get(config.auth_email_header.as_str())
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|e| !e.is_empty())?;

    let name = headers
        .get(config.auth_name_header.as_str())
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    Some(Principal {
        email: email.to_string(),
        name,
    })
}

/// Browsers get sent to the login page, API clients get a 401 carrying the
/// login url.
pub fn unauthenticated(headers: &HeaderMap, login_url: &str, return_to: &str) -> Response {
    let wants_html = headers
        .get(header::ACCEPT)
        .and_then(|h| h.to_str().ok())
        .map(|accept| accept.contains("text/html"))
        .unwrap_or(false);

    if wants_html {
        let separator = if login_url.contains('?') { '&' } else { '?' };
        let target = format!(
            "{}{}returnTo={}",
            login_url,
            separator,
            urlencoding::encode(return_to)
        );
        return Redirect::to(&target).into_response();
    }

    RewardsError::Unauthenticated {
        login_url: login_url.to_string(),
    }
    .into_response()
}

/// Resolves the caller to a user row (creating it on first sight) and stores
/// it in the request extensions for the handlers.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(principal) = principal_from_headers(request.headers(), &state.config) else {
        let return_to = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        tracing::debug!("Unauthenticated request to {}", return_to);
        return unauthenticated(request.headers(), &state.config.login_url, &return_to);
    };

    let user = match state
        .rewards
        .current_user(&principal.email, principal.name.as_deref())
        .await
    {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    #[test]
    fn principal_needs_email() {
        let config = Config::for_tests();
        let mut headers = HeaderMap::new();
        assert!(principal_from_headers(&headers, &config).is_none());

        headers.insert("x-auth-email", HeaderValue::from_static("  "));
        assert!(principal_from_headers(&headers, &config).is_none());

        headers.insert("x-auth-email", HeaderValue::from_static("dana@example.com"));
        headers.insert("x-auth-name", HeaderValue::from_static("Dana"));
        assert_eq!(
            principal_from_headers(&headers, &config),
            Some(Principal {
                email: "dana@example.com".to_string(),
                name: Some("Dana".to_string()),
            })
        );
    }

    #[test]
    fn browsers_are_redirected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml"));

        let response = unauthenticated(&headers, "/api/auth/login", "/rewards?tab=history");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/api/auth/login?returnTo=%2Frewards%3Ftab%3Dhistory"
        );
    }

    #[test]
    fn api_clients_get_401() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let response = unauthenticated(&headers, "/api/auth/login", "/rewards");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::LOCATION).is_none());
    }
}
