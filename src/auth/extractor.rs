use std::future::{ready, Ready};

use super::jwt::JwtKeys;
use crate::models::user::{User, UserQuery, ROLE_ADMIN};
use crate::DbPool;
use actix_web::{
    dev::Payload, error::ResponseError, http::StatusCode, web, FromRequest, HttpRequest,
    HttpResponse,
};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use derive_more::Display;
use serde::Serialize;

#[derive(Debug, Display)]
pub enum AuthError {
    #[display(fmt = "missing_token")]
    MissingToken,
    #[display(fmt = "invalid_token")]
    InvalidToken(jsonwebtoken::errors::Error),
    /// The token verified but its subject has been removed
    #[display(fmt = "unknown_user")]
    UnknownUser,
    #[display(fmt = "unavailable")]
    Unavailable,
    #[display(fmt = "misconfigured")]
    Misconfigured,
}

#[derive(Serialize)]
struct ErrorMessage {
    error: String,
    error_description: String,
    message: String,
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::MissingToken => ErrorMessage {
                error: "missing_token".to_string(),
                error_description: "Authorization header value must follow this format: Bearer access-token".to_string(),
                message: "Authentication required".to_string(),
            },
            Self::InvalidToken(err) => ErrorMessage {
                error: "invalid_token".to_string(),
                error_description: err.to_string(),
                message: "Bad credentials".to_string(),
            },
            Self::UnknownUser => ErrorMessage {
                error: "invalid_token".to_string(),
                error_description: "Token subject no longer exists".to_string(),
                message: "Bad credentials".to_string(),
            },
            Self::Unavailable => ErrorMessage {
                error: "temporarily_unavailable".to_string(),
                error_description: "Could not load the token subject".to_string(),
                message: "Service temporarily unavailable".to_string(),
            },
            Self::Misconfigured => ErrorMessage {
                error: "internal_error".to_string(),
                error_description: "Token verification is not configured".to_string(),
                message: "Internal server error".to_string(),
            },
        };

        HttpResponse::build(self.status_code())
            .insert_header(("WWW-Authenticate", "Bearer"))
            .json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::InvalidToken(_) | Self::UnknownUser => {
                StatusCode::UNAUTHORIZED
            }
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Misconfigured => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The verified caller of a protected route.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Owners and admins may act on a user's records.
    pub fn can_access(&self, owner_id: i32) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authorize(req).map_err(Into::into))
    }
}

fn authorize(req: &HttpRequest) -> Result<AuthUser, AuthError> {
    let bearer = BearerAuth::extract(req).into_inner().map_err(|_| {
        log::debug!("Rejected {} {}: no bearer token", req.method(), req.path());
        AuthError::MissingToken
    })?;

    let keys = req.app_data::<web::Data<JwtKeys>>().ok_or_else(|| {
        log::error!("JwtKeys missing from app data");
        AuthError::Misconfigured
    })?;

    let claims = keys.verify(bearer.token()).map_err(|err| {
        log::info!("Rejected {} {}: {}", req.method(), req.path(), err);
        AuthError::InvalidToken(err)
    })?;

    // role and email come from the current row, not from the token
    let pool = req.app_data::<web::Data<DbPool>>().ok_or_else(|| {
        log::error!("Database pool missing from app data");
        AuthError::Misconfigured
    })?;
    let mut conn = pool.get().map_err(|e| {
        log::error!("Could not get connection to load user {}: {}", claims.sub, e);
        AuthError::Unavailable
    })?;
    let user = User::get(&mut conn, UserQuery::Id(claims.sub))
        .map_err(|_| AuthError::Unavailable)?
        .ok_or_else(|| {
            log::info!("Rejected {} {}: user {} no longer exists", req.method(), req.path(), claims.sub);
            AuthError::UnknownUser
        })?;

    if user.role != claims.role {
        log::info!("User {} role changed to {} since token was issued", user.id, user.role);
    }

    Ok(AuthUser {
        id: user.id,
        email: user.email,
        role: user.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_test_db, create_test_user};
    use actix_web::{test, App, HttpResponse};
    use chrono::Duration;

    const SECRET: &str = "an-extremely-secret-test-key-of-some-length";

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(format!("{}:{}", user.id, user.role))
    }

    fn bearer(user: &User) -> (&'static str, String) {
        let token = JwtKeys::new(SECRET).issue(user, Duration::hours(1)).unwrap();
        ("Authorization", format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn test_valid_token_is_accepted() {
        let (_dir, pool) = create_test_db();
        let user = create_test_user(&mut pool.get().unwrap(), "me@example.com");
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(JwtKeys::new(SECRET)))
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(bearer(&user))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, format!("{}:user", user.id));
    }

    #[actix_web::test]
    async fn test_missing_and_bad_tokens_are_rejected() {
        let (_dir, pool) = create_test_db();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(JwtKeys::new(SECRET)))
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get().uri("/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", "Bearer nope"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_role_is_read_from_database() {
        let (_dir, pool) = create_test_db();
        let user = create_test_user(&mut pool.get().unwrap(), "demoted@example.com");
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(JwtKeys::new(SECRET)))
                .route("/me", web::get().to(whoami)),
        )
        .await;

        // token minted while the user was an admin
        let stale = User {
            role: ROLE_ADMIN.to_string(),
            ..user.clone()
        };
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(bearer(&stale))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, format!("{}:user", user.id));
    }

    #[actix_web::test]
    async fn test_token_for_removed_user_is_rejected() {
        let (_dir, pool) = create_test_db();
        let mut ghost = create_test_user(&mut pool.get().unwrap(), "ghost@example.com");
        ghost.id += 100;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(JwtKeys::new(SECRET)))
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(bearer(&ghost))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_missing_app_data_is_server_error() {
        let (_dir, pool) = create_test_db();
        let user = create_test_user(&mut pool.get().unwrap(), "lonely@example.com");

        let app = test::init_service(App::new().route("/me", web::get().to(whoami))).await;
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(bearer(&user))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(JwtKeys::new(SECRET)))
                .route("/me", web::get().to(whoami)),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(bearer(&user))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[core::prelude::v1::test]
    fn test_can_access() {
        let user = AuthUser {
            id: 1,
            email: "a@example.com".to_string(),
            role: "user".to_string(),
        };
        assert!(user.can_access(1));
        assert!(!user.can_access(2));

        let admin = AuthUser {
            role: ROLE_ADMIN.to_string(),
            ..user
        };
        assert!(admin.can_access(2));
    }
}
