use crate::models::User;

/// Acting identity of one request. Anonymous when `user` is `None`.
#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub user: Option<User>,
    pub request_id: String,
    pub is_staff: bool,
}

impl ViewerContext {
    pub fn anonymous(request_id: String) -> Self {
        ViewerContext {
            user: None,
            request_id,
            is_staff: false,
        }
    }

    pub fn authenticated_user(user: User, request_id: String, is_staff: bool) -> Self {
        ViewerContext {
            user: Some(user),
            request_id,
            is_staff,
        }
    }
}
