//! Route handlers.

pub mod health;
pub mod jwks;
pub mod login;
pub mod oauth;
pub mod protected;
pub mod root;
pub mod users;

use axum::http::StatusCode;

/// Parse a path id, mapping failures to a 400 instead of letting them fall
/// through to the generic error handler.
///
/// # Errors
/// Returns `400 Invalid ID` for anything that is not an `i32`.
pub fn parse_id(raw: &str) -> Result<i32, (StatusCode, String)> {
    raw.parse::<i32>()
        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid ID".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_parse() {
        assert_eq!(parse_id("42"), Ok(42));
        assert_eq!(parse_id("-7"), Ok(-7));
    }

    #[test]
    fn garbage_ids_are_bad_requests() {
        for raw in ["abc", "", "1.5", "99999999999999999999"] {
            let err = parse_id(raw).unwrap_err();
            assert_eq!(err.0, StatusCode::BAD_REQUEST);
            assert_eq!(err.1, "Invalid ID");
        }
    }
}
