// ViewerContext Middleware - resolves the acting identity of a request
// Creates the ViewerContext and injects it into request extensions

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::infrastructure::{database::DatabaseInterface, viewer::ViewerContext};

/// Header set by the authenticating proxy in front of the service
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

/// Application state the middleware needs to resolve a viewer
pub trait HasViewerDirectory {
    fn database(&self) -> &Arc<dyn DatabaseInterface>;
    fn is_staff(&self, username: &str) -> bool;
}

/// ViewerContext middleware that creates request-scoped viewer context.
/// An asserted username that is not registered is treated as anonymous.
pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    T: HasViewerDirectory + Clone + Send + Sync + 'static,
{
    let request_id = format!("req-{}", Uuid::new_v4());
    let username = extract_remote_user(request.headers())?;

    let viewer_context = match username {
        Some(username) => {
            let user = app_state
                .database()
                .get_user_by_username(&username)
                .await
                .map_err(|e| {
                    error!("Failed to resolve viewer {}: {}", username, e);
                    StatusCode::INTERNAL_SERVER_ERROR
                })?;
            match user {
                Some(user) => {
                    let is_staff = app_state.is_staff(&user.username);
                    debug!(%request_id, viewer = %user.username, "Authenticated request");
                    ViewerContext::authenticated_user(user, request_id, is_staff)
                }
                None => {
                    warn!(%request_id, "Unknown remote user {}, continuing anonymously", username);
                    ViewerContext::anonymous(request_id)
                }
            }
        }
        None => ViewerContext::anonymous(request_id),
    };

    request.extensions_mut().insert(Arc::new(viewer_context));
    Ok(next.run(request).await)
}

/// Username asserted by the proxy, if any
fn extract_remote_user(headers: &HeaderMap) -> Result<Option<String>, StatusCode> {
    match headers.get(REMOTE_USER_HEADER) {
        Some(value) => {
            let username = value.to_str().map_err(|_| StatusCode::BAD_REQUEST)?.trim();
            Ok((!username.is_empty()).then(|| username.to_string()))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_remote_user() {
        let mut headers = HeaderMap::new();
        headers.insert(REMOTE_USER_HEADER, HeaderValue::from_static(" leo "));
        assert_eq!(extract_remote_user(&headers).unwrap(), Some("leo".to_string()));
    }

    #[test]
    fn test_missing_or_blank_header_is_anonymous() {
        assert_eq!(extract_remote_user(&HeaderMap::new()).unwrap(), None);

        let mut headers = HeaderMap::new();
        headers.insert(REMOTE_USER_HEADER, HeaderValue::from_static("  "));
        assert_eq!(extract_remote_user(&headers).unwrap(), None);
    }

    #[test]
    fn test_non_ascii_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(
            REMOTE_USER_HEADER,
            HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap(),
        );
        assert_eq!(
            extract_remote_user(&headers).unwrap_err(),
            StatusCode::BAD_REQUEST
        );
    }
}
