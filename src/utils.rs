use std::{error, fmt};

use actix_web::http::StatusCode;
use actix_web::HttpResponse;

/// Provide a representation for any type that implements `Error`
pub fn error_chain_fmt(e: &impl error::Error, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{e}\n")?;

    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{cause}")?;
        current = cause.source();
    }

    Ok(())
}

/// JSON error body
#[derive(serde::Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// Return a JSON `{"error": ...}` response with the specified status code
pub fn json_error(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(ErrorBody { error: message })
}
