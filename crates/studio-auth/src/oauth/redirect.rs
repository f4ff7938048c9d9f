//! Redirect URI validation.
//!
//! Clients never register free-form redirect URIs. The only acceptable
//! targets are derived from the client's website URL and, optionally, a
//! preview URL pattern such as `https://*.vercel.app`:
//!
//! - `{website_url}/__nuxt_studio/auth/sso` (exact string match)
//! - any URI matching `{preview_pattern}/__nuxt_studio/auth/sso`, where each
//!   `*` matches one or more characters other than `/`
//!
//! A wildcard can therefore never span a path segment, and the match is
//! anchored at both ends.

use regex::Regex;
use url::Url;

/// Callback path appended to every client origin.
pub const STUDIO_CALLBACK_PATH: &str = "/__nuxt_studio/auth/sso";

/// A preview URL pattern that could not be compiled.
#[derive(Debug, thiserror::Error)]
#[error("Invalid preview URL pattern '{pattern}': {source}")]
pub struct RedirectPatternError {
    /// The pattern as registered.
    pub pattern: String,
    /// Underlying regex error.
    #[source]
    pub source: regex::Error,
}

/// Reasons a website URL or preview pattern is rejected at registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebsiteUrlError {
    /// Not an absolute URL.
    #[error("Invalid website URL: {0}")]
    Malformed(String),

    /// Plain http outside localhost.
    #[error("URL must use HTTPS. Only http://localhost is allowed for development.")]
    InsecureScheme,

    /// Path, query or fragment present.
    #[error(
        "Website URL should not include a path. The callback path will be added automatically."
    )]
    HasPath,
}

/// Builds the canonical callback URL for `website_url`.
///
/// ```
/// use studio_auth::oauth::redirect::build_callback_url;
///
/// assert_eq!(
///     build_callback_url("https://docs.example.com/"),
///     "https://docs.example.com/__nuxt_studio/auth/sso"
/// );
/// ```
#[must_use]
pub fn build_callback_url(website_url: &str) -> String {
    format!("{}{}", strip_trailing_slash(website_url), STUDIO_CALLBACK_PATH)
}

/// Returns `true` if `redirect_uri` is an acceptable target for a client with
/// the given website URL and preview pattern.
///
/// A pattern that fails to compile is logged and treated as non-matching.
#[must_use]
pub fn validate_redirect_uri(
    redirect_uri: &str,
    website_url: &str,
    preview_pattern: Option<&str>,
) -> bool {
    if redirect_uri == build_callback_url(website_url) {
        return true;
    }

    let Some(pattern) = preview_pattern.filter(|p| !p.is_empty()) else {
        return false;
    };

    match compile_preview_pattern(pattern) {
        Ok(regex) => regex.is_match(redirect_uri),
        Err(e) => {
            tracing::error!(error = %e, "Ignoring preview URL pattern");
            false
        }
    }
}

/// Compiles a preview URL pattern into an anchored matcher for its callback URL.
///
/// Every regex metacharacter is escaped; `*` becomes `[^/]+`.
///
/// # Errors
///
/// Returns `RedirectPatternError` if the resulting expression does not compile.
pub fn compile_preview_pattern(pattern: &str) -> Result<Regex, RedirectPatternError> {
    let body = strip_trailing_slash(pattern)
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("[^/]+");
    let expression = format!("^{}{}$", body, regex::escape(STUDIO_CALLBACK_PATH));

    Regex::new(&expression).map_err(|source| RedirectPatternError {
        pattern: pattern.to_string(),
        source,
    })
}

/// Validates and normalizes a client website URL.
///
/// The URL must be `https` (or `http` on `localhost`/`127.0.0.1`) and consist
/// of an origin only. Returns the URL without a trailing slash.
///
/// # Errors
///
/// Returns the first `WebsiteUrlError` that applies.
pub fn validate_website_url(website_url: &str) -> Result<String, WebsiteUrlError> {
    let url = Url::parse(website_url)
        .map_err(|_| WebsiteUrlError::Malformed(website_url.to_string()))?;

    if url.host_str().is_none() {
        return Err(WebsiteUrlError::Malformed(website_url.to_string()));
    }

    check_scheme(&url)?;

    if (url.path() != "/" && !url.path().is_empty())
        || url.query().is_some()
        || url.fragment().is_some()
    {
        return Err(WebsiteUrlError::HasPath);
    }

    Ok(strip_trailing_slash(website_url).to_string())
}

/// Validates a preview URL pattern at registration time.
///
/// Only the scheme is checked; wildcards make the host unparseable as a URL.
///
/// # Errors
///
/// Returns `WebsiteUrlError::InsecureScheme` for anything other than
/// `https://` or `http://localhost`.
pub fn validate_preview_pattern(pattern: &str) -> Result<String, WebsiteUrlError> {
    let secure = pattern.starts_with("https://")
        || pattern.starts_with("http://localhost")
        || pattern.starts_with("http://127.0.0.1");
    if !secure {
        return Err(WebsiteUrlError::InsecureScheme);
    }
    Ok(strip_trailing_slash(pattern).to_string())
}

fn check_scheme(url: &Url) -> Result<(), WebsiteUrlError> {
    match url.scheme() {
        "https" => Ok(()),
        "http" if matches!(url.host_str(), Some("localhost") | Some("127.0.0.1")) => Ok(()),
        "http" => Err(WebsiteUrlError::InsecureScheme),
        _ => Err(WebsiteUrlError::Malformed(url.to_string())),
    }
}

fn strip_trailing_slash(value: &str) -> &str {
    value.strip_suffix('/').unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEBSITE: &str = "https://docs.example.com";
    const PREVIEW: &str = "https://*.vercel.app";

    #[test]
    fn test_build_callback_url() {
        assert_eq!(
            build_callback_url("https://docs.example.com/"),
            "https://docs.example.com/__nuxt_studio/auth/sso"
        );
        assert_eq!(
            build_callback_url("https://docs.example.com"),
            "https://docs.example.com/__nuxt_studio/auth/sso"
        );
    }

    #[test]
    fn test_exact_match() {
        assert!(validate_redirect_uri(
            "https://docs.example.com/__nuxt_studio/auth/sso",
            WEBSITE,
            None
        ));
        assert!(validate_redirect_uri(
            "https://docs.example.com/__nuxt_studio/auth/sso",
            "https://docs.example.com/",
            None
        ));
    }

    #[test]
    fn test_exact_match_is_not_normalized() {
        assert!(!validate_redirect_uri(
            "https://docs.example.com/__nuxt_studio/auth/sso/",
            WEBSITE,
            None
        ));
        assert!(!validate_redirect_uri(
            "https://DOCS.example.com/__nuxt_studio/auth/sso",
            WEBSITE,
            None
        ));
        assert!(!validate_redirect_uri(
            "https://docs.example.com/__nuxt_studio/auth/sso?next=/",
            WEBSITE,
            None
        ));
    }

    #[test]
    fn test_preview_pattern_match() {
        assert!(validate_redirect_uri(
            "https://preview123.vercel.app/__nuxt_studio/auth/sso",
            WEBSITE,
            Some(PREVIEW)
        ));
        assert!(validate_redirect_uri(
            "https://my-branch-abc.vercel.app/__nuxt_studio/auth/sso",
            WEBSITE,
            Some("https://*.vercel.app/")
        ));
    }

    #[test]
    fn test_preview_pattern_rejects_other_hosts() {
        assert!(!validate_redirect_uri(
            "https://evil.com/__nuxt_studio/auth/sso",
            WEBSITE,
            Some(PREVIEW)
        ));
        assert!(!validate_redirect_uri(
            "https://a.vercel.app.evil.com/__nuxt_studio/auth/sso",
            WEBSITE,
            Some(PREVIEW)
        ));
    }

    #[test]
    fn test_literal_dot_in_pattern() {
        assert!(!validate_redirect_uri(
            "https://xyzvercelXapp/__nuxt_studio/auth/sso",
            WEBSITE,
            Some("https://xyz*.vercel.app")
        ));
    }

    #[test]
    fn test_wildcard_cannot_span_path_segments() {
        assert!(!validate_redirect_uri(
            "https://x.a.com/__nuxt_studio/auth/sso/../../secret",
            WEBSITE,
            Some("https://*.a.com/*")
        ));
        assert!(!validate_redirect_uri(
            "https://evil.com/x.vercel.app/__nuxt_studio/auth/sso",
            WEBSITE,
            Some(PREVIEW)
        ));
    }

    #[test]
    fn test_wildcard_requires_one_character() {
        assert!(!validate_redirect_uri(
            "https://.vercel.app/__nuxt_studio/auth/sso",
            WEBSITE,
            Some(PREVIEW)
        ));
    }

    #[test]
    fn test_pattern_metacharacters_are_literal() {
        let regex = compile_preview_pattern("https://(a|b)+.example.com").unwrap();
        assert!(regex.is_match("https://(a|b)+.example.com/__nuxt_studio/auth/sso"));
        assert!(!regex.is_match("https://aa.example.com/__nuxt_studio/auth/sso"));
    }

    #[test]
    fn test_empty_pattern_is_ignored() {
        assert!(!validate_redirect_uri(
            "https://anything/__nuxt_studio/auth/sso",
            WEBSITE,
            Some("")
        ));
    }

    #[test]
    fn test_validate_website_url() {
        assert_eq!(
            validate_website_url("https://docs.example.com/").unwrap(),
            "https://docs.example.com"
        );
        assert_eq!(
            validate_website_url("http://localhost:3000").unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            validate_website_url("http://docs.example.com"),
            Err(WebsiteUrlError::InsecureScheme)
        );
        assert_eq!(
            validate_website_url("https://docs.example.com/docs"),
            Err(WebsiteUrlError::HasPath)
        );
        assert_eq!(
            validate_website_url("https://docs.example.com/?a=1"),
            Err(WebsiteUrlError::HasPath)
        );
        assert!(matches!(
            validate_website_url("docs.example.com"),
            Err(WebsiteUrlError::Malformed(_))
        ));
    }

    #[test]
    fn test_validate_preview_pattern() {
        assert_eq!(
            validate_preview_pattern("https://*.vercel.app/").unwrap(),
            "https://*.vercel.app"
        );
        assert!(validate_preview_pattern("http://localhost:*").is_ok());
        assert_eq!(
            validate_preview_pattern("http://*.vercel.app"),
            Err(WebsiteUrlError::InsecureScheme)
        );
    }
}
