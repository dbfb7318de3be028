//! Embedded HTML pages for the login demo.
//!
//! Templates carry `{{placeholder}}` markers filled in by [`render`];
//! every substituted value is HTML-escaped unless the placeholder name
//! ends in `_html`, which marks a pre-built fragment.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::error::AppError;

const INDEX_HTML: &str = include_str!("templates/index.html");
const PROFILE_HTML: &str = include_str!("templates/profile.html");
const TOKENS_HTML: &str = include_str!("templates/tokens.html");
const ERROR_HTML: &str = include_str!("templates/error.html");

pub fn index(vars: &[(&str, &str)]) -> Html<String> {
    Html(render(INDEX_HTML, vars))
}

pub fn profile(vars: &[(&str, &str)]) -> Html<String> {
    Html(render(PROFILE_HTML, vars))
}

pub fn tokens(vars: &[(&str, &str)]) -> Html<String> {
    Html(render(TOKENS_HTML, vars))
}

/// Error page shown for provider failures and incomplete configuration.
///
/// Converting from [`AppError`] lets page handlers use `?` on the OIDC
/// client calls.
pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
}

impl ErrorPage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
        }
    }

    /// Page listing the OAuth settings that still need values
    pub fn missing_config(missing: &[&str]) -> Self {
        let items: String = missing
            .iter()
            .map(|name| format!("<li><code>{}</code></li>", escape(name)))
            .collect();
        Self::new(format!(
            "Configuration incomplete. The following settings are missing:\
             <ul>{items}</ul>\
             Set them and restart the service."
        ))
    }
}

impl From<AppError> for ErrorPage {
    fn from(err: AppError) -> Self {
        Self {
            status: StatusCode::OK,
            message: escape(&err.to_string()),
        }
    }
}

impl IntoResponse for ErrorPage {
    fn into_response(self) -> Response {
        let body = render(ERROR_HTML, &[("message_html", &self.message)]);
        (self.status, Html(body)).into_response()
    }
}

/// Fill `{{placeholder}}` markers in a template
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let pattern = format!("{{{{{key}}}}}");
        let replacement = if key.ends_with("_html") {
            (*value).to_string()
        } else {
            escape(value)
        };
        result = result.replace(&pattern, &replacement);
    }
    result
}

pub fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
