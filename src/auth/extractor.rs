//! Resolves the caller identity for every protected handler.
//!
//! A bearer JWT always wins. When the service sits behind an authenticating
//! proxy (`TRUST_FORWARDED_IDENTITY=true`) the `x-user-id` / `x-user-role`
//! headers are accepted instead.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;

use crate::error::AppError;
use crate::models::AuthUser;
use crate::state::AppState;

pub const FORWARDED_USER_HEADER: &str = "x-user-id";
pub const FORWARDED_ROLE_HEADER: &str = "x-user-role";

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Ok(TypedHeader(Authorization(bearer))) =
            parts.extract::<TypedHeader<Authorization<Bearer>>>().await
        {
            let claims = state.auth.validate_token(bearer.token())?;
            return Ok(claims.into());
        }

        if state.auth.trusts_forwarded_identity() {
            if let Some(user) = forwarded_identity(parts) {
                return Ok(user);
            }
        }

        tracing::debug!(path = %parts.uri.path(), "Request without resolvable identity");
        Err(AppError::Unauthenticated(
            "Missing or invalid credentials".to_string(),
        ))
    }
}

fn forwarded_identity(parts: &Parts) -> Option<AuthUser> {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    Some(AuthUser {
        user_id: header(FORWARDED_USER_HEADER)?,
        role: header(FORWARDED_ROLE_HEADER)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/rooms");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_forwarded_identity_requires_both_headers() {
        let parts = parts_with(&[(FORWARDED_USER_HEADER, "u1"), (FORWARDED_ROLE_HEADER, "parent")]);
        assert_eq!(
            forwarded_identity(&parts),
            Some(AuthUser {
                user_id: "u1".to_string(),
                role: "parent".to_string()
            })
        );

        let parts = parts_with(&[(FORWARDED_USER_HEADER, "u1")]);
        assert_eq!(forwarded_identity(&parts), None);

        let parts = parts_with(&[(FORWARDED_USER_HEADER, " "), (FORWARDED_ROLE_HEADER, "parent")]);
        assert_eq!(forwarded_identity(&parts), None);
    }
}
