use http::{Method, StatusCode};
use std::io::{self, Read};
use tracing::{debug, warn};

use crate::dispatcher::{Request, Response};

/// Why a wire request never reached the dispatcher.
#[derive(Debug)]
pub enum Rejection {
    /// The method token is not a valid HTTP method
    BadMethod(String),
    /// The body exceeds the configured limit
    PayloadTooLarge { limit: usize },
    /// Reading the body failed
    Io(io::Error),
}

impl Rejection {
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Rejection::BadMethod(_) | Rejection::Io(_) => {
                Response::error(StatusCode::BAD_REQUEST, "Bad Request")
            }
            Rejection::PayloadTooLarge { .. } => {
                Response::error(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
            }
        }
    }
}

/// Convert a `may_minihttp` request into a [`Request`].
///
/// Header names are lowercased. The body is read up to `max_body_bytes`;
/// anything larger, or a larger declared `content-length`, is rejected.
///
/// # Errors
///
/// A [`Rejection`] describing the response to send instead.
pub fn parse_request(
    req: may_minihttp::Request,
    max_body_bytes: usize,
) -> Result<Request, Rejection> {
    let method = Method::from_bytes(req.method().as_bytes())
        .map_err(|_| Rejection::BadMethod(req.method().to_string()))?;
    let mut parsed = Request::new(method, req.path());

    let mut declared_len: Option<usize> = None;
    for h in req.headers() {
        let value = String::from_utf8_lossy(h.value).into_owned();
        if h.name.eq_ignore_ascii_case("content-length") {
            declared_len = value.trim().parse().ok();
        }
        parsed.push_header(h.name, value);
    }
    debug!(
        method = %parsed.method(),
        path = %parsed.path(),
        header_count = parsed.headers().len(),
        "Request parsed"
    );

    if let Some(len) = declared_len {
        if len > max_body_bytes {
            warn!(
                path = %parsed.path(),
                content_length = len,
                limit = max_body_bytes,
                "Request body over limit"
            );
            return Err(Rejection::PayloadTooLarge {
                limit: max_body_bytes,
            });
        }
    }

    let mut body = Vec::new();
    let limit = u64::try_from(max_body_bytes).unwrap_or(u64::MAX).saturating_add(1);
    req.body()
        .take(limit)
        .read_to_end(&mut body)
        .map_err(Rejection::Io)?;
    if body.len() > max_body_bytes {
        warn!(path = %parsed.path(), limit = max_body_bytes, "Request body over limit");
        return Err(Rejection::PayloadTooLarge {
            limit: max_body_bytes,
        });
    }

    Ok(parsed.with_body(body))
}
