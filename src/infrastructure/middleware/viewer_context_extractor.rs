// ViewerContext Extractors - handler-facing access to the request viewer

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use crate::error::AppError;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::User;

/// Where anonymous viewers are sent when a route needs a user
pub const LOGIN_PATH: &str = "/auth/login";

/// Cheap-to-clone handle on the request's ViewerContext.
///
/// ```ignore
/// async fn handler(vc: Vc) -> impl IntoResponse {
///     format!("{}", vc.request_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let vc = parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc(vc.clone()))
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR);

        async move { vc }
    }
}

/// A registered viewer. Anonymous requests are redirected to the login page
/// with the original path and query in `next`, before the handler runs.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let result = match parts.extensions.get::<Arc<ViewerContext>>() {
            Some(vc) => match &vc.user {
                Some(user) => Ok(AuthenticatedUser(user.clone())),
                None => Err(login_redirect(requested_target(parts)).into_response()),
            },
            None => Err(StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        };

        async move { result }
    }
}

/// A viewer listed as staff; everyone else gets 403
#[derive(Debug, Clone)]
pub struct StaffUser(pub User);

impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let result = match parts.extensions.get::<Arc<ViewerContext>>() {
            Some(vc) => match &vc.user {
                Some(user) if vc.is_staff => Ok(StaffUser(user.clone())),
                Some(_) => Err(AppError::Forbidden("Staff access required".to_string())
                    .into_response()),
                None => Err(login_redirect(requested_target(parts)).into_response()),
            },
            None => Err(StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        };

        async move { result }
    }
}

/// Path and query as the client sent them, before any `nest` prefix stripping
fn requested_target(parts: &Parts) -> &str {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map(|original| &original.0)
        .unwrap_or(&parts.uri);
    uri.path_and_query()
        .map(|target| target.as_str())
        .unwrap_or_else(|| uri.path())
}

/// Login redirect carrying `next` as a single percent-encoded query value
pub fn login_redirect(next: &str) -> Redirect {
    Redirect::to(&format!("{}?next={}", LOGIN_PATH, urlencoding::encode(next)))
}
