use axum::{http::StatusCode, Json};
use coolstory_common::Report;

/// Anything a handler could not recover from. Logged, then answered as a
/// bare `500`.
#[derive(Debug)]
pub struct Error(Report);

impl Error {
    pub fn from_any<A>(err: A) -> Self
    where
        A: Into<Report>,
    {
        Self(err.into())
    }
}

impl From<Report> for Error {
    fn from(err: Report) -> Self {
        Self(err)
    }
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum_core::response::Response {
        #[derive(serde::Serialize)]
        struct Res {
            error: ResErr,
        }

        #[derive(serde::Serialize)]
        struct ResErr {
            code: u16,
            status: &'static str,
        }

        let err = self.0;

        tracing::error!(error = ?err, "error handling request");

        let status = StatusCode::INTERNAL_SERVER_ERROR;

        let body = Res {
            error: ResErr {
                code: status.as_u16(),
                status: "internal server error",
            },
        };

        (status, Json(body)).into_response()
    }
}
