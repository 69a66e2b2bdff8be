//! HTTP Basic Authentication for the host console

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
    response::Redirect,
};
use base64::Engine;
use std::sync::Arc;

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Username for the host console (None = auth disabled)
    pub username: Option<String>,
    /// Password for the host console
    pub password: Option<String>,
}

impl AuthConfig {
    /// Load auth config from environment variables.
    /// HOST_USERNAME and HOST_PASSWORD must both be set to enable auth.
    pub fn from_env() -> Self {
        let username = std::env::var("HOST_USERNAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let password = std::env::var("HOST_PASSWORD")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if username.is_some() && password.is_some() {
            tracing::info!("Host authentication enabled");
            Self { username, password }
        } else {
            if username.is_some() || password.is_some() {
                tracing::warn!(
                    "HOST_USERNAME and HOST_PASSWORD must both be set to enable authentication"
                );
            }
            tracing::warn!("Host authentication DISABLED - anyone can access the host console!");
            Self {
                username: None,
                password: None,
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Validate credentials
    pub fn validate(&self, username: &str, password: &str) -> bool {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => {
                // Constant-time comparison to prevent timing attacks
                constant_time_eq(u.as_bytes(), username.as_bytes())
                    && constant_time_eq(p.as_bytes(), password.as_bytes())
            }
            _ => true, // Auth disabled, allow all
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Pull `Basic user:pass` out of the Authorization header and validate it
fn request_is_authorized(auth_config: &AuthConfig, request: &Request<Body>) -> bool {
    let Some(auth_header) = request.headers().get(header::AUTHORIZATION) else {
        return false;
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return false;
    };
    let Some(credentials) = auth_str.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(credentials) else {
        return false;
    };
    let Ok(decoded_str) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((username, password)) = decoded_str.split_once(':') else {
        return false;
    };
    auth_config.validate(username, password)
}

fn unauthorized(realm: &str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header(
            header::WWW_AUTHENTICATE,
            format!("Basic realm=\"{realm}\""),
        )
        .body(Body::from("Unauthorized"))
        .unwrap()
}

/// Middleware for HTTP Basic Authentication on host routes
pub async fn host_auth_middleware(
    State(auth_config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if !auth_config.is_enabled() {
        return next.run(request).await;
    }

    if request_is_authorized(&auth_config, &request) {
        return next.run(request).await;
    }

    unauthorized("PubQuiz Host")
}

fn query_param_equals(request: &Request<Body>, key: &str, expected: &str) -> bool {
    let Some(query) = request.uri().query() else {
        return false;
    };
    for pair in query.split('&') {
        let Some((k, v)) = pair.split_once('=') else {
            continue;
        };
        if k == key && v == expected {
            return true;
        }
    }
    false
}

/// Middleware to require HTTP Basic Auth for host WebSocket connections.
///
/// This prevents clients from taking over by connecting to `/ws?role=host`.
pub async fn host_ws_auth_middleware(
    State(auth_config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let is_host_ws = request.uri().path() == "/ws" && query_param_equals(&request, "role", "host");

    if !is_host_ws {
        return next.run(request).await;
    }

    // If host auth is disabled, keep dev behavior (allow) but log loudly.
    if !auth_config.is_enabled() {
        tracing::warn!(
            "Host WebSocket requested but host authentication is DISABLED; set HOST_USERNAME and HOST_PASSWORD to prevent host takeover"
        );
        return next.run(request).await;
    }

    if request_is_authorized(&auth_config, &request) {
        return next.run(request).await;
    }

    unauthorized("PubQuiz Host (WebSocket)")
}

pub async fn redirect_host_html() -> Redirect {
    Redirect::temporary("/host")
}

/// Handler to serve host.html (used with auth middleware)
pub async fn serve_host() -> impl IntoResponse {
    serve_static_page("static/host.html", "Host page not found").await
}

/// Handler to serve team.html
pub async fn serve_team() -> impl IntoResponse {
    serve_static_page("static/team.html", "Team page not found").await
}

/// Handler to serve board.html (projector standings view)
pub async fn serve_board() -> impl IntoResponse {
    serve_static_page("static/board.html", "Board page not found").await
}

async fn serve_static_page(path: &str, not_found: &'static str) -> Response<Body> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .body(Body::from(content))
            .unwrap(),
        Err(_) => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from(not_found))
            .unwrap(),
    }
}
