use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

const PDF_DISPOSITION: &str = "attachment; filename=\"generated.pdf\"";

/// Binary PDF download response.
pub fn pdf(bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static(PDF_DISPOSITION),
            ),
        ],
        bytes,
    )
        .into_response()
}
