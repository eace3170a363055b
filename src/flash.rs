//! One-shot flash messages carried in a short-lived cookie.
//!
//! A redirect sets the cookie to a short code; the target page reads it,
//! renders the display text, and clears it with a Max-Age=0 Set-Cookie.

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

pub const FLASH_COOKIE: &str = "warble_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    Unauthorized,
    InvalidCredentials,
    Taken,
    LoggedOut,
    MessageTooLong,
    SignupInvalid,
}

impl Flash {
    fn code(self) -> &'static str {
        match self {
            Flash::Unauthorized => "unauthorized",
            Flash::InvalidCredentials => "invalid-credentials",
            Flash::Taken => "taken",
            Flash::LoggedOut => "logged-out",
            Flash::MessageTooLong => "message-too-long",
            Flash::SignupInvalid => "signup-invalid",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "unauthorized" => Some(Flash::Unauthorized),
            "invalid-credentials" => Some(Flash::InvalidCredentials),
            "taken" => Some(Flash::Taken),
            "logged-out" => Some(Flash::LoggedOut),
            "message-too-long" => Some(Flash::MessageTooLong),
            "signup-invalid" => Some(Flash::SignupInvalid),
            _ => None,
        }
    }

    /// Text shown in the page's alert box.
    pub fn text(self) -> &'static str {
        match self {
            Flash::Unauthorized => "Access unauthorized.",
            Flash::InvalidCredentials => "Invalid credentials.",
            Flash::Taken => "Username or email already taken.",
            Flash::LoggedOut => "You have been logged out.",
            Flash::MessageTooLong => "Message must be 140 characters or fewer.",
            Flash::SignupInvalid => "Username and password are required.",
        }
    }
}

/// Set-Cookie value that stashes a flash for the next page load.
pub fn set_cookie(flash: Flash) -> String {
    format!("{}={}; Path=/; Max-Age=60", FLASH_COOKIE, flash.code())
}

/// 302 redirect that stashes a flash for the target page.
pub fn redirect_with_flash(to: &str, flash: Flash) -> Response {
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, to.to_string()),
            (header::SET_COOKIE, set_cookie(flash)),
        ],
    )
        .into_response()
}

/// The uniform "Access unauthorized" treatment for protected routes.
pub fn unauthorized_redirect() -> Response {
    redirect_with_flash("/", Flash::Unauthorized)
}

/// Plain 302 redirect.
pub fn redirect(to: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, to.to_string())]).into_response()
}

/// Read the pending flash from the request's cookies, if any.
pub fn take(headers: &HeaderMap) -> Option<Flash> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == FLASH_COOKIE {
                Flash::from_code(val)
            } else {
                None
            }
        })
}

/// Set-Cookie value that clears the flash after it has been shown.
pub fn clear_cookie() -> String {
    format!("{}=; Path=/; Max-Age=0", FLASH_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn codes_round_trip() {
        for flash in [
            Flash::Unauthorized,
            Flash::InvalidCredentials,
            Flash::Taken,
            Flash::LoggedOut,
            Flash::MessageTooLong,
            Flash::SignupInvalid,
        ] {
            assert_eq!(Flash::from_code(flash.code()), Some(flash));
        }
        assert_eq!(Flash::from_code("nonsense"), None);
    }

    #[test]
    fn take_reads_the_flash_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("warble_session=abc; warble_flash=unauthorized"),
        );
        assert_eq!(take(&headers), Some(Flash::Unauthorized));
    }

    #[test]
    fn take_ignores_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("other=value"));
        assert_eq!(take(&headers), None);
    }

    #[test]
    fn unauthorized_redirect_is_302_to_root() {
        let response = unauthorized_redirect();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("warble_flash=unauthorized"));
    }
}
