use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::{access_log::ClientMetadata, error::AppError};

pub const ACTOR_HEADER: &str = "x-actor-id";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const MAX_ACTOR_LEN: usize = 128;
const MAX_FORWARDED_ADDR_LEN: usize = 64;

/// Caller identity as supplied by the upstream session layer. The register
/// records it verbatim and does not authenticate it.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub client: ClientMetadata,
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Best-effort client details for the audit log. A forwarded address that
/// does not fit the audit column is dropped rather than failing the request.
fn client_metadata(headers: &HeaderMap) -> ClientMetadata {
    ClientMetadata {
        ip_address: header_text(headers, FORWARDED_FOR_HEADER).and_then(|value| {
            value
                .split(',')
                .next()
                .map(|first| first.trim().to_string())
                .filter(|first| !first.is_empty())
                .filter(|first| first.chars().count() <= MAX_FORWARDED_ADDR_LEN)
        }),
        user_agent: header_text(headers, "user-agent"),
    }
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let id = header_text(headers, ACTOR_HEADER)
        .ok_or_else(|| AppError::bad_request(format!("{ACTOR_HEADER} header is required")))?;
    if id.chars().count() > MAX_ACTOR_LEN {
        return Err(AppError::bad_request(format!(
            "{ACTOR_HEADER} must be at most {MAX_ACTOR_LEN} characters"
        )));
    }
    Ok(Actor {
        id,
        client: client_metadata(headers),
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers)
    }
}
