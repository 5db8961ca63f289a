// src/auth.rs

use std::collections::HashSet;
use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpMessage, HttpRequest, HttpResponse};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::user::normalize_email;
use crate::models::{LoginInfo, NewUser, PublicUser, SignupInfo};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    /// Absent when the server runs with token expiry disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<usize>,
}

/// Body returned by signup and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

/// The identity resolved from a bearer token, placed in request extensions
/// by [`crate::middleware::Authentication`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub PublicUser);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or(ApiError::Unauthenticated),
        )
    }
}

// JWT Creation
pub fn create_jwt(
    user_id: &str,
    secret: &str,
    ttl: Option<Duration>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp() as usize,
        exp: ttl.map(|ttl| (now + ttl).timestamp() as usize),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
}

// JWT Validation. `exp` is checked whenever present but not required, so
// tokens minted with expiry disabled stay valid.
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.required_spec_claims = HashSet::new();
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;
    Ok(token_data.claims)
}

pub fn issue_token(state: &AppState, user_id: &str) -> ApiResult<String> {
    create_jwt(user_id, &state.config.jwt_secret, state.config.token_ttl())
        .map_err(|e| ApiError::Internal(format!("Error signing token: {}", e)))
}

/// Resolves an `Authorization` header value to a live user.
pub async fn authenticate(state: &AppState, header: Option<&str>) -> ApiResult<AuthUser> {
    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthenticated)?;

    let claims = validate_jwt(token, &state.config.jwt_secret).map_err(|e| {
        debug!("Token rejected: {}", e);
        ApiError::Unauthenticated
    })?;

    match state.users.find_by_id(&claims.sub).await? {
        Some(user) => Ok(AuthUser(user.public())),
        None => {
            warn!("Token for unknown user {}", claims.sub);
            Err(ApiError::Unauthenticated)
        }
    }
}

async fn hash_password(password: String, cost: u32) -> ApiResult<String> {
    web::block(move || hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(format!("Error hashing password: {}", e)))
}

async fn verify_password(password: String, hashed: String) -> ApiResult<bool> {
    let matched = web::block(move || verify(password, &hashed).unwrap_or(false))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(matched)
}

// Signup Endpoint
pub async fn signup(
    data: web::Data<AppState>,
    signup_info: web::Json<SignupInfo>,
) -> ApiResult<HttpResponse> {
    let valid = signup_info.into_inner().validate()?;

    if data.users.find_by_email(&valid.email).await?.is_some() {
        return Err(ApiError::validation("Email is already registered"));
    }

    let password_hash = hash_password(valid.password, data.config.bcrypt_cost).await?;
    let user = data
        .users
        .insert(NewUser {
            name: valid.name,
            email: valid.email,
            password_hash,
        })
        .await?;

    let token = issue_token(&data, &user.id)?;
    info!("User {} signed up", user.id);
    Ok(HttpResponse::Created().json(AuthResponse {
        user: user.public(),
        token,
    }))
}

// Login Endpoint
pub async fn login(
    data: web::Data<AppState>,
    login_info: web::Json<LoginInfo>,
) -> ApiResult<HttpResponse> {
    let LoginInfo { email, password } = login_info.into_inner();
    let user = data
        .users
        .find_by_email(&normalize_email(&email))
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(password, user.password.clone()).await? {
        debug!("Password mismatch for user {}", user.id);
        return Err(ApiError::InvalidCredentials);
    }

    let token = issue_token(&data, &user.id)?;
    info!("User {} logged in", user.id);
    Ok(HttpResponse::Ok().json(AuthResponse {
        user: user.public(),
        token,
    }))
}

/// GET /api/auth/me
pub async fn me(user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(user.0)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn state() -> AppState {
        AppState::in_memory(Config::local(SECRET))
    }

    #[actix_web::test]
    async fn authenticate_resolves_existing_users_only() {
        let state = state();
        let user = state
            .users
            .insert(NewUser {
                name: "Ana".into(),
                email: "ana@x.com".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();

        let token = issue_token(&state, &user.id).unwrap();
        let header = format!("Bearer {}", token);
        let resolved = authenticate(&state, Some(&header)).await.unwrap();
        assert_eq!(resolved.id(), user.id);

        let ghost = issue_token(&state, "000000000000000000000000").unwrap();
        let header = format!("Bearer {}", ghost);
        assert!(matches!(
            authenticate(&state, Some(&header)).await,
            Err(ApiError::Unauthenticated)
        ));

        assert!(authenticate(&state, None).await.is_err());
        assert!(authenticate(&state, Some(token.as_str())).await.is_err());
        assert!(authenticate(&state, Some("Bearer ")).await.is_err());
    }

    #[actix_web::test]
    async fn signup_then_login() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(json!({ "name": "Ana", "email": "Ana@X.com", "password": "pw123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: AuthResponse = test::read_body_json(resp).await;
        assert_eq!(body.user.email, "ana@x.com");
        assert!(!body.token.is_empty());

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "ana@x.com", "password": "pw123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let login: AuthResponse = test::read_body_json(resp).await;
        assert_eq!(login.user, body.user);

        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header(("Authorization", format!("Bearer {}", login.token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let me: PublicUser = test::read_body_json(resp).await;
        assert_eq!(me.name, "Ana");
    }

    #[actix_web::test]
    async fn duplicate_signup_and_bad_login_are_400() {
        let state = state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(crate::configure),
        )
        .await;

        let signup = json!({ "name": "Ana", "email": "ana@x.com", "password": "pw123" });
        for expected in [StatusCode::CREATED, StatusCode::BAD_REQUEST] {
            let req = test::TestRequest::post()
                .uri("/api/auth/signup")
                .set_json(&signup)
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), expected);
        }
        assert!(state.users.find_by_email("ana@x.com").await.unwrap().is_some());

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "ana@x.com", "password": "wrong" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid login credentials");

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "nobody@x.com", "password": "pw123" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn signup_with_missing_fields_is_400() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(json!({ "email": "ana@x.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "name is required");
    }
}
