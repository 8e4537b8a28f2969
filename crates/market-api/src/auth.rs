//! Caller identity extractors.
//!
//! Authentication happens upstream; the verified identity arrives in
//! `X-User-*` headers.

use crate::handlers::ErrorResponse;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use market_core::Buyer;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_PHONE_HEADER: &str = "x-user-phone";
pub const USER_ROLE_HEADER: &str = "x-user-role";

const ADMIN_ROLE: &str = "admin";

type Rejection = (StatusCode, Json<ErrorResponse>);

/// Any signed-in caller
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }

    /// Buyer details forwarded to the gateway
    pub fn buyer(&self) -> Buyer {
        let mut buyer = Buyer::new(&self.id);
        if let Some(email) = &self.email {
            buyer = buyer.with_email(email);
        }
        if let Some(phone) = &self.phone {
            buyer = buyer.with_phone(phone);
        }
        buyer
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(&parts.headers, USER_ID_HEADER).ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Authentication required", 401)),
            )
        })?;

        Ok(Self {
            id,
            email: header(&parts.headers, USER_EMAIL_HEADER),
            phone: header(&parts.headers, USER_PHONE_HEADER),
            role: header(&parts.headers, USER_ROLE_HEADER),
        })
    }
}

/// Caller with the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err((
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::new("Admin access required", 403)),
            ));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_missing_user_id_is_unauthorized() {
        let mut parts = parts(&[("x-user-email", "a@b.c")]);
        let (status, _) = AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_user_headers_are_read() {
        let mut parts = parts(&[
            ("X-User-Id", "u1"),
            ("X-User-Email", "buyer@example.com"),
            ("X-User-Phone", "  "),
        ]);
        let user = AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert_eq!(user.id, "u1");
        assert_eq!(user.email.as_deref(), Some("buyer@example.com"));
        assert_eq!(user.phone, None);
        assert!(!user.is_admin());

        let buyer = user.buyer();
        assert_eq!(buyer.id, "u1");
        assert_eq!(buyer.email.as_deref(), Some("buyer@example.com"));
    }

    #[tokio::test]
    async fn test_admin_requires_role() {
        let mut plain = parts(&[("X-User-Id", "u1")]);
        let (status, _) = AdminUser::from_request_parts(&mut plain, &())
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);

        let mut admin = parts(&[("X-User-Id", "root"), ("X-User-Role", "admin")]);
        let AdminUser(user) = AdminUser::from_request_parts(&mut admin, &())
            .await
            .unwrap();
        assert_eq!(user.id, "root");
    }
}
