//! Authorization based on the user id header set by the auth gateway.
//! Roles come from the stored profile, never from the request.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{app_error::AppError, app_state::AppState, models::Role};

pub const USER_ID_HEADER: &str = "x-user-id";

/// Reads the caller's id.
pub fn current_user_id(headers: &HeaderMap) -> Result<Uuid, AppError> {
    headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized("Sign in to continue".into()))?
        .to_str()
        .ok()
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| AppError::Unauthorized("Malformed user id".into()))
}

/// Like [`current_user_id`] but for routes that also serve anonymous callers.
pub fn optional_user_id(headers: &HeaderMap) -> Option<Uuid> {
    current_user_id(headers).ok()
}

/// Requires a signed-in caller and exposes `Extension<Uuid>` to the handlers.
pub async fn users_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let user_id = current_user_id(req.headers())?;
    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

/// Requires a signed-in caller whose stored profile has the admin role.
pub async fn admins_authorization(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = current_user_id(req.headers())?;
    let role = state.profiles.role_of(user_id).await?;
    if role != Some(Role::Admin) {
        return Err(AppError::ForbiddenResource(
            "Administrator access required".into(),
        ));
    }
    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn missing_or_malformed_ids_are_unauthorized() {
        let mut headers = HeaderMap::new();
        assert!(matches!(current_user_id(&headers), Err(AppError::Unauthorized(_))));
        assert_eq!(optional_user_id(&headers), None);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(matches!(current_user_id(&headers), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_ID_HEADER,
            HeaderValue::from_str(&format!(" {id} ")).unwrap(),
        );

        assert_eq!(current_user_id(&headers).unwrap(), id);
        assert_eq!(optional_user_id(&headers), Some(id));
    }
}
