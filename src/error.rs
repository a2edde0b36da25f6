//! Error types for the trading engine and the REST API.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;


/// Broad class of a failure, used to tell callers whose fault it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request itself is malformed.
    InvalidInput,
    /// The request is well formed but a business rule refuses it.
    Rejected,
    /// A collaborator (storage, accounts) failed.
    Infrastructure,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid input"),
            Self::Rejected => write!(f, "trade rejected"),
            Self::Infrastructure => write!(f, "infrastructure failure"),
        }
    }
}

/// Errors produced by pricing, quoting and settlement.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarketError {
    /// Symbol is not one of the supported commodities.
    #[error("invalid input: unsupported symbol '{0}'")]
    InvalidSymbol(String),

    /// Timestamp could not be parsed or is out of range.
    #[error("invalid input: invalid time '{0}'")]
    InvalidTime(String),

    /// Quantity is not positive, not finite, or has more than 4 decimals.
    #[error("invalid input: invalid quantity '{0}'")]
    InvalidQuantity(String),

    /// Side is neither `buy` nor `sell`.
    #[error("invalid input: invalid side '{0}', expected 'buy' or 'sell'")]
    InvalidSide(String),

    /// History window outside 12..=720 hours or not an integer.
    #[error("invalid input: history window must be an integer between 12 and 720 hours, got '{0}'")]
    InvalidWindow(String),

    /// User id is not a positive integer.
    #[error("invalid input: invalid user id '{0}'")]
    InvalidUser(String),

    /// Balance does not cover the trade.
    #[error("trade rejected: insufficient funds, required {required:.2}, available {available:.2}")]
    InsufficientFunds {
        /// Total cost of the trade.
        required: f64,
        /// Balance reported by the account service.
        available: f64,
    },

    /// User holds none of the symbol.
    #[error("trade rejected: no holdings of {0}")]
    NoHoldings(String),

    /// User holds less than the requested quantity.
    #[error("trade rejected: insufficient quantity, requested {requested}, held {held}")]
    InsufficientQuantity {
        /// Quantity the user tried to sell.
        requested: f64,
        /// Quantity currently held.
        held: f64,
    },

    /// Trading is switched off for the symbol.
    #[error("trade rejected: trading is disabled for {0}")]
    TradingDisabled(String),

    /// Order exceeds the per-symbol maximum.
    #[error("trade rejected: order quantity {requested} exceeds maximum {max} for {symbol}")]
    OrderTooLarge {
        /// Commodity symbol.
        symbol: String,
        /// Requested quantity.
        requested: f64,
        /// Configured maximum.
        max: f64,
    },

    /// Holdings store could not be read or written.
    #[error("infrastructure failure: holdings store: {0}")]
    Persistence(String),

    /// Account service could not be reached or refused the posting.
    #[error("infrastructure failure: account service: {0}")]
    AccountService(String),
}

impl MarketError {
    /// Category this error belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSymbol(_)
            | Self::InvalidTime(_)
            | Self::InvalidQuantity(_)
            | Self::InvalidSide(_)
            | Self::InvalidWindow(_)
            | Self::InvalidUser(_) => ErrorCategory::InvalidInput,
            Self::InsufficientFunds { .. }
            | Self::NoHoldings(_)
            | Self::InsufficientQuantity { .. }
            | Self::TradingDisabled(_)
            | Self::OrderTooLarge { .. } => ErrorCategory::Rejected,
            Self::Persistence(_) | Self::AccountService(_) => ErrorCategory::Infrastructure,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSymbol(_) => "INVALID_SYMBOL",
            Self::InvalidTime(_) => "INVALID_TIME",
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::InvalidSide(_) => "INVALID_SIDE",
            Self::InvalidWindow(_) => "INVALID_WINDOW",
            Self::InvalidUser(_) => "INVALID_USER",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::NoHoldings(_) => "NO_HOLDINGS",
            Self::InsufficientQuantity { .. } => "INSUFFICIENT_QUANTITY",
            Self::TradingDisabled(_) => "TRADING_DISABLED",
            Self::OrderTooLarge { .. } => "ORDER_TOO_LARGE",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
            Self::AccountService(_) => "ACCOUNT_SERVICE_FAILURE",
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: String,
    /// Error category.
    pub category: String,
}

/// API error types.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Engine error.
    #[error(transparent)]
    Market(#[from] MarketError),

    /// Invalid request.
    #[error("invalid input: {0}")]
    InvalidRequest(String),

    /// Internal server error.
    #[error("infrastructure failure: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str, ErrorCategory) {
        match self {
            ApiError::Market(err) => {
                let status = match err {
                    MarketError::TradingDisabled(_) => StatusCode::FORBIDDEN,
                    MarketError::AccountService(_) => StatusCode::BAD_GATEWAY,
                    MarketError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
                    other => match other.category() {
                        ErrorCategory::InvalidInput => StatusCode::BAD_REQUEST,
                        ErrorCategory::Rejected => StatusCode::CONFLICT,
                        ErrorCategory::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
                    },
                };
                (status, err.code(), err.category())
            }
            ApiError::InvalidRequest(_) => (
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
                ErrorCategory::InvalidInput,
            ),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                ErrorCategory::Infrastructure,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, category) = self.status_and_code();

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            category: category.to_string(),
        });

        (status, body).into_response()
    }
}
