use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, warn};

use crate::dispatcher::Response;

/// Upper bound on distinct dynamic header lines kept for the process lifetime.
pub const MAX_INTERNED_HEADERS: usize = 4096;

/// Upper bound on leaked `X-Request-Id` lines, counted apart from
/// [`MAX_INTERNED_HEADERS`].
pub const MAX_LEAKED_REQUEST_IDS: usize = 1 << 20;

const REQUEST_ID_PREFIX: &str = "x-request-id:";

/// `may_minihttp` only accepts `&'static str` header lines. Lines that are
/// not one of the fixed strings below are leaked once and reused; past
/// [`MAX_INTERNED_HEADERS`] new lines are dropped.
static HEADER_LINES: Lazy<DashMap<String, &'static str>> = Lazy::new(DashMap::new);
static OVERFLOW_WARNED: AtomicBool = AtomicBool::new(false);

/// Request ids are unique per response, so they are never cached and never
/// occupy [`HEADER_LINES`].
static REQUEST_ID_LINES: AtomicUsize = AtomicUsize::new(0);
static REQUEST_ID_WARNED: AtomicBool = AtomicBool::new(false);

fn well_known(line: &str) -> Option<&'static str> {
    Some(match line {
        "Content-Type: application/json" => "Content-Type: application/json",
        "Content-Type: text/plain; charset=utf-8" => "Content-Type: text/plain; charset=utf-8",
        "Content-Type: text/html" => "Content-Type: text/html",
        "Content-Type: text/html; charset=utf-8" => "Content-Type: text/html; charset=utf-8",
        "Content-Type: text/css" => "Content-Type: text/css",
        "Content-Type: application/javascript" => "Content-Type: application/javascript",
        "Content-Type: application/octet-stream" => "Content-Type: application/octet-stream",
        _ => return None,
    })
}

fn is_request_id_line(line: &str) -> bool {
    line.get(..REQUEST_ID_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(REQUEST_ID_PREFIX))
}

fn leak(line: &str) -> &'static str {
    Box::leak(line.to_string().into_boxed_str())
}

fn leak_request_id_line(line: &str) -> Option<&'static str> {
    let claimed = REQUEST_ID_LINES.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
        (n < MAX_LEAKED_REQUEST_IDS).then_some(n + 1)
    });
    if claimed.is_ok() {
        return Some(leak(line));
    }
    if !REQUEST_ID_WARNED.swap(true, Ordering::Relaxed) {
        warn!(
            capacity = MAX_LEAKED_REQUEST_IDS,
            "Request id header budget exhausted; x-request-id is no longer echoed on the wire"
        );
    }
    None
}

/// Return a `'static` copy of `line`, or `None` once its budget is spent.
///
/// `X-Request-Id` lines draw from their own budget, so a long-running server
/// never loses low-cardinality headers such as `Content-Type` or `Allow`.
pub fn intern_header_line(line: &str) -> Option<&'static str> {
    if let Some(s) = well_known(line) {
        return Some(s);
    }
    if is_request_id_line(line) {
        return leak_request_id_line(line);
    }
    if let Some(s) = HEADER_LINES.get(line) {
        return Some(*s);
    }
    if HEADER_LINES.len() >= MAX_INTERNED_HEADERS {
        if OVERFLOW_WARNED.swap(true, Ordering::Relaxed) {
            debug!(header = %line, "Dropped response header, intern cache full");
        } else {
            warn!(
                header = %line,
                capacity = MAX_INTERNED_HEADERS,
                "Response header intern cache is full; further new header lines are dropped"
            );
        }
        return None;
    }
    let entry = HEADER_LINES
        .entry(line.to_string())
        .or_insert_with(|| leak(line));
    Some(*entry)
}

/// Canonical `Name: value` spelling for the wire.
fn header_line(name: &str, value: &str) -> String {
    let mut out = String::with_capacity(name.len() + value.len() + 2);
    let mut upper = true;
    for c in name.chars() {
        out.push(if upper { c.to_ascii_uppercase() } else { c });
        upper = c == '-';
    }
    out.push_str(": ");
    out.push_str(value);
    out
}

/// Write a [`Response`] onto the `may_minihttp` response.
pub fn write_response(res: &mut may_minihttp::Response, response: &Response) {
    let status = response.status;
    res.status_code(
        usize::from(status.as_u16()),
        status.canonical_reason().unwrap_or("Unknown"),
    );

    if response.header("content-type").is_none() {
        if let Some(ct) = response.content_type() {
            if let Some(line) = intern_header_line(&header_line("content-type", ct)) {
                res.header(line);
            }
        }
    }
    for (name, value) in &response.headers {
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        if let Some(line) = intern_header_line(&header_line(name, value)) {
            res.header(line);
        }
    }
    res.body_vec(response.body_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_line_is_canonicalised() {
        assert_eq!(header_line("content-type", "text/css"), "Content-Type: text/css");
        assert_eq!(header_line("x-request-id", "1"), "X-Request-Id: 1");
        assert_eq!(header_line("allow", "GET, POST"), "Allow: GET, POST");
    }

    #[test]
    fn test_interning_reuses_the_same_str() {
        let a = intern_header_line("X-Test-Intern: one").unwrap();
        let b = intern_header_line("X-Test-Intern: one").unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(
            intern_header_line("Content-Type: application/json"),
            Some("Content-Type: application/json")
        );
    }

    #[test]
    fn test_request_ids_do_not_crowd_out_other_headers() {
        let cached_before = HEADER_LINES.len();
        for i in 0..MAX_INTERNED_HEADERS + 10 {
            let line = header_line("x-request-id", &format!("id-{i}"));
            assert!(intern_header_line(&line).is_some());
        }
        assert!(HEADER_LINES.len() <= cached_before + 2);

        assert_eq!(
            intern_header_line("Content-Type: image/png"),
            Some("Content-Type: image/png")
        );
        assert_eq!(intern_header_line("Allow: GET, POST"), Some("Allow: GET, POST"));
    }

    #[test]
    fn test_request_id_prefix_is_case_insensitive() {
        assert!(is_request_id_line("X-Request-Id: 01H"));
        assert!(is_request_id_line("x-request-id: 01H"));
        assert!(!is_request_id_line("X-Request: 01H"));
        assert!(!is_request_id_line("Allow"));
    }
}
