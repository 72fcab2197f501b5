//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//!
//! Responses carry a JSON body `{"error": "...", "field": "..."}`; `field` is
//! present for validation errors tied to one input.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{CartError, CatalogError, OrderError, ReviewError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Review(#[from] ReviewError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Session could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Request body is not valid JSON for the endpoint.
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl AppError {
    /// HTTP status for the error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Cart(err) => match err {
                CartError::InvalidQuantity(_) | CartError::InsufficientStock { .. } => {
                    StatusCode::BAD_REQUEST
                }
                CartError::ProductNotFound(_) | CartError::NotInCart(_) => StatusCode::NOT_FOUND,
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Catalog(err) => match err {
                CatalogError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
                CatalogError::ProductNotFound(_)
                | CatalogError::CategoryNotFound(_)
                | CatalogError::CollectionNotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Order(err) => match err {
                OrderError::Unauthorized => StatusCode::UNAUTHORIZED,
                OrderError::EmptyCart
                | OrderError::InvalidPhone(_)
                | OrderError::InvalidDeliveryWindow => StatusCode::BAD_REQUEST,
                OrderError::DeliveryTypeNotFound(_)
                | OrderError::DeliveryNotFound(_)
                | OrderError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                OrderError::NotOwner => StatusCode::FORBIDDEN,
                OrderError::AlreadyPaid(_) => StatusCode::CONFLICT,
                OrderError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Review(err) => match err {
                ReviewError::Unauthorized => StatusCode::UNAUTHORIZED,
                ReviewError::InvalidRating(_) => StatusCode::BAD_REQUEST,
                ReviewError::ProductNotFound(_) | ReviewError::ReviewNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                ReviewError::AlreadyReviewed => StatusCode::CONFLICT,
                ReviewError::NotOwner => StatusCode::FORBIDDEN,
                ReviewError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Database(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::InvalidBody(rejection) => rejection.status(),
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Input field a validation error refers to.
    fn field(&self) -> Option<String> {
        let field = match self {
            Self::Cart(CartError::InvalidQuantity(_) | CartError::InsufficientStock { .. }) => {
                "quantity"
            }
            Self::Catalog(CatalogError::InvalidFilter(err)) => return Some(err.param.clone()),
            Self::Order(OrderError::InvalidPhone(_)) => "phone",
            Self::Order(OrderError::InvalidDeliveryWindow) => "datetime_to",
            Self::Review(ReviewError::InvalidRating(_)) => "rating",
            _ => return None,
        };
        Some(field.to_owned())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let error = if status.is_server_error() {
            "Internal server error".to_owned()
        } else {
            match &self {
                Self::Unauthorized(msg) => msg.clone(),
                Self::InvalidBody(rejection) => rejection.body_text(),
                other => other.to_string(),
            }
        };

        let body = ErrorBody {
            error,
            field: self.field(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Associates errors raised later in the request with the logged-in user.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Item added", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use furnish_core::{OrderId, ProductId, Quantity, ReviewId};

    use super::*;

    fn get_status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Unauthorized("login required".to_string());
        assert_eq!(err.to_string(), "Unauthorized: login required");

        let err = AppError::Internal("pool closed".to_string());
        assert_eq!(err.to_string(), "Internal error: pool closed");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(RepositoryError::NotFound),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("duplicate".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_domain_error_status_codes() {
        let invalid = Quantity::new(0).map(|_| ()).unwrap_err();
        assert_eq!(
            get_status(CartError::InvalidQuantity(invalid)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CartError::ProductNotFound(ProductId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(get_status(OrderError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(OrderError::NotOwner), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(OrderError::AlreadyPaid(OrderId::new(1))),
            StatusCode::CONFLICT
        );
        assert_eq!(get_status(ReviewError::AlreadyReviewed), StatusCode::CONFLICT);
        assert_eq!(get_status(ReviewError::NotOwner), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(ReviewError::ReviewNotFound(ReviewId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CartError::Repository(RepositoryError::DataCorruption(
                "bad row".to_owned()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_errors_name_the_field() {
        let err = AppError::from(OrderError::InvalidDeliveryWindow);
        assert_eq!(err.field().as_deref(), Some("datetime_to"));
        assert_eq!(AppError::from(ReviewError::NotOwner).field(), None);
    }
}
