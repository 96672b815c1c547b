use crate::error::Error;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub(crate) struct APIError(anyhow::Error);

impl IntoResponse for APIError {
    fn into_response(self) -> Response {
        let any_err = self.0;
        let (status, kind) = if let Some(err) = any_err.downcast_ref::<Error>() {
            (error_status(err), err.kind())
        } else if let Some(err) = any_err.downcast_ref::<JsonRejection>() {
            (json_rejection_status(err), "invalid_request")
        } else if any_err.is::<PathRejection>() || any_err.is::<QueryRejection>() {
            (StatusCode::BAD_REQUEST, "invalid_request")
        } else {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        };
        if status.is_server_error() {
            tracing::error!("request failed: {any_err:?}");
        }
        let body = Json(json!({
            "error": format!("{any_err}"),
            "kind": kind,
        }));
        (status, body).into_response()
    }
}

fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::ValidationFailure { .. }
        | Error::MissingParameter(_)
        | Error::UnexpectedParameter(_)
        | Error::InvalidRange(_) => StatusCode::BAD_REQUEST,
        Error::SequenceOverflow { .. } | Error::AlreadyReserved { .. } | Error::NotReservable(_) => {
            StatusCode::CONFLICT
        }
        Error::ResolverError { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_rejection_status(err: &JsonRejection) -> StatusCode {
    match err {
        JsonRejection::JsonDataError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        JsonRejection::JsonSyntaxError(_) => StatusCode::BAD_REQUEST,
        JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl<E> From<E> for APIError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
