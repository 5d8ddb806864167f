//! Transport-agnostic outcome of a submit call.

use serde::Serialize;

use crate::engine::{Created, EngineError};
use crate::model::ReservationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Created,
    Unprocessable,
    InternalError,
}

impl Status {
    /// HTTP-style numeric code for transports that want one.
    pub fn code(self) -> u16 {
        match self {
            Status::Created => 201,
            Status::Unprocessable => 422,
            Status::InternalError => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status: Status,
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reservation_ids: Vec<ReservationId>,
}

impl Response {
    fn new(status: Status, message: String) -> Self {
        Self {
            status,
            code: status.code(),
            message,
            reservation_ids: Vec::new(),
        }
    }

    /// Rejection for input that could not even be decoded into a request.
    pub fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::new(Status::Unprocessable, format!("malformed request: {reason}"))
    }
}

impl From<&Result<Created, EngineError>> for Response {
    fn from(result: &Result<Created, EngineError>) -> Self {
        match result {
            Ok(created) => Self {
                reservation_ids: created.reservations.iter().map(|r| r.id).collect(),
                ..Self::new(
                    Status::Created,
                    format!("created, {} reservations", created.count),
                )
            },
            Err(EngineError::Internal(_)) => {
                Self::new(Status::InternalError, "internal error".to_string())
            }
            Err(e) => Self::new(Status::Unprocessable, e.to_string()),
        }
    }
}

impl From<Result<Created, EngineError>> for Response {
    fn from(result: Result<Created, EngineError>) -> Self {
        Self::from(&result)
    }
}
