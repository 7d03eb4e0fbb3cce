use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use sqlx::PgPool;

use crate::domain::UserId;
use crate::profile_store::{get_directory, get_profile};
use crate::utils::{error_chain_fmt, json_error};

/// Profile lookup error type
#[derive(thiserror::Error)]
pub enum ProfileError {
    #[error("Invalid user ID")]
    InvalidUserId,
    #[error("Profile not found")]
    NotFound,
    #[error("Server error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl fmt::Debug for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ProfileError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidUserId => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error(self.status_code(), &self.to_string())
    }
}

/// Community directory handler
#[tracing::instrument(name = "List profile directory", skip(db_pool))]
pub async fn profile_directory(db_pool: web::Data<PgPool>) -> Result<HttpResponse, ProfileError> {
    let entries = get_directory(&db_pool).await?;
    tracing::info!(count = entries.len(), "Profiles fetched successfully");
    Ok(HttpResponse::Ok().json(entries))
}

/// Single profile handler
#[tracing::instrument(name = "Get profile by user ID", skip(db_pool))]
pub async fn profile_by_id(
    path: web::Path<String>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, ProfileError> {
    let user_id = parse_user_id(&path).ok_or(ProfileError::InvalidUserId)?;
    let profile = get_profile(user_id, &db_pool)
        .await?
        .ok_or(ProfileError::NotFound)?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Accept positive integer identifiers only
fn parse_user_id(raw: &str) -> Option<UserId> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .map(UserId::new)
}
