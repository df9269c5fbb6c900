//! Route handlers.
//!
//! Each handler takes the shared [`AppState`] and the request, and returns
//! `Result<_, ApiError>`; the error side already knows its status and body.
//! Account routes live here; catalog, order and image routes in [`shop`].

mod shop;

pub use shop::{
    delete_user, list_products, list_users, place_order, product, upload_image, user_image,
    user_orders, OrderRequest, OrderRequestLine,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::auth::{bearer_token, AuthError, Identity, Role};
use crate::catalog::CatalogError;
use crate::directory::{DirectoryError, NewUser, UserRecord, UserUpdate};
use crate::images::ImageError;
use crate::mail::Mail;
use crate::orders::OrderError;
use crate::request::Request;
use crate::response::{IntoResponse, Json, Response};
use crate::status::Status;

const MIN_PASSWORD_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("malformed JSON body")]
    MalformedBody,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid id")]
    InvalidId,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => Response::builder()
                .status(Status::BadRequest)
                .json_value(&json!({ "errors": errors })),
            Self::MalformedBody | Self::InvalidId => Response::message(Status::BadRequest, &self.to_string()),
            Self::InvalidCredentials => Response::message(Status::Unauthorized, &self.to_string()),
            Self::NotFound(_) => Response::message(Status::NotFound, &self.to_string()),
            Self::Auth(e) => e.into_response(),
            Self::Directory(DirectoryError::DuplicateEmail) => {
                Response::message(Status::Conflict, "email already registered")
            }
            Self::Directory(DirectoryError::Unavailable(reason)) | Self::Unavailable(reason) => {
                error!(%reason, "backing store unavailable");
                Response::message(Status::ServiceUnavailable, "service unavailable")
            }
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<OrderError> for ApiError {
    fn from(e: OrderError) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<ImageError> for ApiError {
    fn from(e: ImageError) -> Self {
        Self::Unavailable(e.to_string())
    }
}

pub(crate) fn body<T: for<'de> Deserialize<'de>>(req: &Request) -> Result<T, ApiError> {
    req.json().map_err(|_| ApiError::MalformedBody)
}

/// Set by the route guard; absent only if a route was registered unguarded.
pub(crate) fn caller(req: &Request) -> Result<Identity, ApiError> {
    Identity::of(req).ok_or(ApiError::Auth(AuthError::MissingToken))
}

pub(crate) fn path_id(req: &Request) -> Result<u64, ApiError> {
    req.param("id").and_then(|id| id.parse().ok()).ok_or(ApiError::InvalidId)
}

/// The caller's identity, once it is known to cover the `{id}` in the path.
pub(crate) fn caller_for_path(req: &Request) -> Result<(Identity, u64), ApiError> {
    let caller = caller(req)?;
    let id = path_id(req)?;
    if !caller.may_access(id) {
        return Err(AuthError::Forbidden.into());
    }
    Ok((caller, id))
}

fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    }
}

// ── register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
    pub phone: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        let mut require = |ok: bool, field: &'static str, message: &'static str| {
            if !ok {
                errors.push(FieldError { field, message });
            }
        };

        require(!self.name.trim().is_empty(), "name", "name is required");
        require(valid_email(&self.email), "email", "a valid email is required");
        require(
            self.password.chars().count() >= MIN_PASSWORD_LEN,
            "password",
            "password must be at least 3 characters",
        );
        require(!self.address.trim().is_empty(), "address", "address is required");
        require(!self.phone.trim().is_empty(), "phone", "phone is required");

        if errors.is_empty() { Ok(()) } else { Err(ApiError::Validation(errors)) }
    }
}

pub async fn register(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    let form: Registration = body(&req)?;
    form.validate()?;

    let user = state.directory
        .create(NewUser {
            name: form.name,
            email: form.email,
            password: form.password,
            address: form.address,
            phone: form.phone,
            role: Role::User,
        })
        .await?;

    info!(user_id = user.id, "user registered");

    if let Err(e) = state.mailer.send(Mail::welcome(&user.email, &user.name)).await {
        warn!(user_id = user.id, error = %e, "welcome mail not sent");
    }

    Ok(Response::builder()
        .status(Status::Created)
        .header("location", &format!("/api/user-details/{}", user.id))
        .json_value(&json!({ "message": "user registered", "id": user.id })))
}

// ── login / logout ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub user: UserRecord,
}

pub async fn login(state: Arc<AppState>, req: Request) -> Result<Json<LoginResponse>, ApiError> {
    let creds: Credentials = body(&req)?;

    let mut errors = Vec::new();
    if !valid_email(&creds.email) {
        errors.push(FieldError { field: "email", message: "a valid email is required" });
    }
    if creds.password.is_empty() {
        errors.push(FieldError { field: "password", message: "password is required" });
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let Some(user) = state.directory.verify_credentials(&creds.email, &creds.password).await? else {
        warn!("login failed");
        return Err(ApiError::InvalidCredentials);
    };

    let token = state.tokens.issue(user.id, user.role)?;
    info!(user_id = user.id, role = %user.role, "login");

    Ok(Json(LoginResponse { message: "login successful", token, user }))
}

pub async fn logout(state: Arc<AppState>, req: Request) -> Result<Status, ApiError> {
    let token = bearer_token(&req).ok_or(AuthError::MissingToken)?;
    state.tokens.revoke(token)?;
    Ok(Status::NoContent)
}

// ── admin ────────────────────────────────────────────────────────────────────

pub async fn admin_dashboard(_state: Arc<AppState>, _req: Request) -> Response {
    Response::message(Status::Ok, "access granted")
}

// ── user details ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

impl ProfileChanges {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());

        if blank(&self.name) {
            errors.push(FieldError { field: "name", message: "name must not be empty" });
        }
        if self.email.as_deref().is_some_and(|e| !valid_email(e)) {
            errors.push(FieldError { field: "email", message: "a valid email is required" });
        }
        if blank(&self.address) {
            errors.push(FieldError { field: "address", message: "address must not be empty" });
        }
        if blank(&self.phone) {
            errors.push(FieldError { field: "phone", message: "phone must not be empty" });
        }

        if errors.is_empty() { Ok(()) } else { Err(ApiError::Validation(errors)) }
    }
}

pub async fn user_details(state: Arc<AppState>, req: Request) -> Result<Json<UserRecord>, ApiError> {
    let (_, id) = caller_for_path(&req)?;
    state.directory.find(id).await?.map(Json).ok_or(ApiError::NotFound("user"))
}

pub async fn update_user_details(
    state: Arc<AppState>,
    req: Request,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (caller, id) = caller_for_path(&req)?;

    let changes: ProfileChanges = body(&req)?;
    changes.validate()?;
    if changes.role.is_some() && caller.role != Role::Admin {
        return Err(AuthError::Forbidden.into());
    }

    let update = UserUpdate {
        name: changes.name,
        email: changes.email,
        address: changes.address,
        phone: changes.phone,
        role: changes.role,
    };
    let user = state.directory.update(id, update).await?.ok_or(ApiError::NotFound("user"))?;
    info!(user_id = id, by = caller.subject_id, "user updated");

    Ok(Json(json!({ "message": "user updated", "user": user })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Registration {
        Registration {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password: "espresso".into(),
            address: "1 Bean St".into(),
            phone: "555-0100".into(),
        }
    }

    fn fields(err: ApiError) -> Vec<&'static str> {
        match err {
            ApiError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn complete_registration_is_valid() {
        assert!(alice().validate().is_ok());
    }

    #[test]
    fn every_bad_field_is_reported() {
        let form = Registration { email: "no-at-sign".into(), password: "ab".into(), ..Registration::default() };
        assert_eq!(fields(form.validate().unwrap_err()), ["name", "email", "password", "address", "phone"]);
    }

    #[test]
    fn email_needs_both_sides_of_the_at() {
        assert!(valid_email("a@b"));
        assert!(!valid_email("@b"));
        assert!(!valid_email("a@"));
        assert!(!valid_email("ab"));
    }

    #[test]
    fn password_length_counts_characters() {
        let form = Registration { password: "☕☕☕".into(), ..alice() };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn blank_profile_changes_are_rejected() {
        let changes = ProfileChanges { name: Some(" ".into()), email: Some("x".into()), ..ProfileChanges::default() };
        assert_eq!(fields(changes.validate().unwrap_err()), ["name", "email"]);
        assert!(ProfileChanges::default().validate().is_ok());
    }

    #[test]
    fn validation_errors_render_as_400_list() {
        let res = ApiError::Validation(vec![FieldError { field: "name", message: "name is required" }])
            .into_response();
        assert_eq!(res.status_code(), 400);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["errors"][0]["field"], "name");
    }

    #[test]
    fn directory_errors_map_to_status() {
        assert_eq!(ApiError::from(DirectoryError::DuplicateEmail).into_response().status_code(), 409);
        let down = ApiError::from(DirectoryError::Unavailable("db".into()));
        assert_eq!(down.into_response().status_code(), 503);
    }
}
