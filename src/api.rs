// HTTP API - routes, handlers and view responses
// Handlers resolve the viewer, call one service operation and answer with a
// JSON view context or a 303 redirect.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    app_state::AppState,
    core::PostId,
    error::AppResult,
    forms::{CommentForm, FormErrors, GroupForm, PostForm, SignupForm},
    infrastructure::middleware::{
        viewer_context_middleware, AuthenticatedUser, StaffUser, Vc, REMOTE_USER_HEADER,
    },
    pagination::PageRequest,
    services::{
        CreatePostOutcome, EditFormOutcome, EditPostOutcome, FormOutcome,
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    fn request(&self) -> PageRequest {
        PageRequest::from_query(self.page.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupView {
    pub form: SignupForm,
    pub errors: FormErrors,
}

/// Create the router with the viewer middleware wrapped around every route
pub fn create_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/posts", get(admin_search_posts))
        .route("/posts/{id}", delete(admin_delete_post))
        .route("/groups", get(admin_list_groups).post(admin_create_group))
        .route("/groups/{slug}", delete(admin_delete_group))
        .route("/users/{username}", delete(admin_remove_user));

    Router::new()
        .route("/", get(index))
        .route("/group/{slug}", get(group_posts))
        .route("/profile/{username}", get(profile))
        .route("/profile/{username}/follow", post(profile_follow))
        .route("/profile/{username}/unfollow", post(profile_unfollow))
        .route("/posts/{id}", get(post_detail))
        .route("/posts/{id}/edit", get(post_edit_form).post(post_edit))
        .route("/posts/{id}/comment", post(add_comment))
        .route("/create", get(post_create_form).post(post_create))
        .route("/follow", get(follow_index))
        .route("/auth/login", get(login))
        .route("/auth/signup", get(signup_form).post(signup))
        .route("/health", get(health))
        .nest("/admin", admin)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            viewer_context_middleware::<AppState>,
        ))
        .with_state(state)
}

async fn index(State(state): State<AppState>, Query(query): Query<PageQuery>) -> AppResult<Response> {
    let view = state.feeds.global_feed(query.request()).await?;
    Ok(Json(view).into_response())
}

async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let view = state.feeds.group_feed(&slug, query.request()).await?;
    Ok(Json(view).into_response())
}

async fn profile(
    State(state): State<AppState>,
    vc: Vc,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let view = state
        .feeds
        .profile_feed(&username, vc.user.as_ref(), query.request())
        .await?;
    Ok(Json(view).into_response())
}

async fn post_detail(State(state): State<AppState>, Path(id): Path<PostId>) -> AppResult<Response> {
    let view = state.feeds.post_detail(id).await?;
    Ok(Json(view).into_response())
}

async fn post_create_form(
    State(state): State<AppState>,
    AuthenticatedUser(_user): AuthenticatedUser,
) -> AppResult<Response> {
    let view = state.posts.create_form().await?;
    Ok(Json(view).into_response())
}

async fn post_create(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(form): Json<PostForm>,
) -> AppResult<Response> {
    match state.posts.create_post(&user, form).await? {
        CreatePostOutcome::Created(post) => {
            Ok(Redirect::to(&format!("/profile/{}", post.author.username)).into_response())
        }
        CreatePostOutcome::Invalid(view) => Ok(Json(view).into_response()),
    }
}

async fn post_edit_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<PostId>,
) -> AppResult<Response> {
    match state.posts.edit_form(&user, id).await? {
        EditFormOutcome::Form(view) => Ok(Json(view).into_response()),
        EditFormOutcome::ReadOnly(detail) => Ok(Json(detail).into_response()),
    }
}

async fn post_edit(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<PostId>,
    Json(form): Json<PostForm>,
) -> AppResult<Response> {
    match state.posts.edit_post(&user, id, form).await? {
        EditPostOutcome::Updated(post) => {
            Ok(Redirect::to(&format!("/posts/{}", post.id)).into_response())
        }
        EditPostOutcome::Invalid(view) => Ok(Json(view).into_response()),
        EditPostOutcome::ReadOnly(detail) => Ok(Json(detail).into_response()),
    }
}

async fn add_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<PostId>,
    Json(form): Json<CommentForm>,
) -> AppResult<Response> {
    state.posts.add_comment(&user, id, form).await?;
    Ok(Redirect::to(&format!("/posts/{}", id)).into_response())
}

async fn profile_follow(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(username): Path<String>,
) -> AppResult<Response> {
    state.posts.follow(&user, &username).await?;
    Ok(Redirect::to("/follow").into_response())
}

async fn profile_unfollow(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(username): Path<String>,
) -> AppResult<Response> {
    state.posts.unfollow(&user, &username).await?;
    Ok(Redirect::to("/follow").into_response())
}

async fn follow_index(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let view = state.feeds.following_feed(&user, query.request()).await?;
    Ok(Json(view).into_response())
}

/// Sign-in happens upstream; this only tells the client where it was going
async fn login(Query(query): Query<LoginQuery>) -> Response {
    Json(json!({
        "next": query.next.unwrap_or_else(|| "/".to_string()),
        "header": REMOTE_USER_HEADER,
    }))
    .into_response()
}

async fn signup_form() -> Response {
    Json(SignupView {
        form: SignupForm::default(),
        errors: FormErrors::new(),
    })
    .into_response()
}

async fn signup(State(state): State<AppState>, Json(form): Json<SignupForm>) -> AppResult<Response> {
    match state.admin.register_user(form.clone()).await? {
        FormOutcome::Saved(_) => Ok(Redirect::to("/").into_response()),
        FormOutcome::Invalid(errors) => Ok(Json(SignupView { form, errors }).into_response()),
    }
}

async fn health(State(state): State<AppState>) -> AppResult<Response> {
    state.db.health_check().await?;
    Ok(Json(json!({ "status": "ok" })).into_response())
}

async fn admin_search_posts(
    State(state): State<AppState>,
    _staff: StaffUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Response> {
    let request = PageRequest::from_query(query.page.as_deref());
    let page = state.admin.search_posts(&query.q, request).await?;
    Ok(Json(page).into_response())
}

async fn admin_delete_post(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<PostId>,
) -> AppResult<Response> {
    state.admin.delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn admin_list_groups(State(state): State<AppState>, _staff: StaffUser) -> AppResult<Response> {
    let groups = state.admin.list_groups().await?;
    Ok(Json(groups).into_response())
}

async fn admin_create_group(
    State(state): State<AppState>,
    _staff: StaffUser,
    Json(form): Json<GroupForm>,
) -> AppResult<Response> {
    match state.admin.create_group(form).await? {
        FormOutcome::Saved(group) => Ok((StatusCode::CREATED, Json(group)).into_response()),
        FormOutcome::Invalid(errors) => {
            Ok((StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response())
        }
    }
}

async fn admin_delete_group(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(slug): Path<String>,
) -> AppResult<Response> {
    state.admin.delete_group(&slug).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn admin_remove_user(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(username): Path<String>,
) -> AppResult<Response> {
    state.admin.remove_user(&username).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
