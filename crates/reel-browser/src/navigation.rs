//! Navigation-target validation for recording sessions.
//!
//! A recording starts by navigating a fresh browser to a caller-supplied
//! URL, so the URL is attacker-reachable input. The gate here is fail-closed:
//! a target is allowed only when it parses as an absolute URL whose scheme is
//! explicitly on the allowlist. `file://` (local filesystem reads),
//! `javascript:` (script execution in the page), `chrome://` and every other
//! scheme are rejected before any browser process is spawned.

use crate::error::BrowserError;

/// Schemes a recording may navigate to. `data:` is included so callers can
/// record against inline deterministic pages.
pub const ALLOWED_SCHEMES: &[&str] = &["http", "https", "data"];

/// Validate a navigation target before any resource is allocated.
///
/// # Errors
///
/// Returns [`BrowserError::DisallowedTarget`] when the URL does not parse as
/// an absolute URL or parses to a scheme outside [`ALLOWED_SCHEMES`].
pub fn validate_navigation_target(raw: &str) -> Result<(), BrowserError> {
    // Step 1: parse. Anything unparseable (including relative URLs, which
    // are meaningless for a fresh browser) is rejected outright.
    let parsed = match url::Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(url = raw, error = %e, "navigation target rejected: unparseable");
            return Err(BrowserError::DisallowedTarget {
                url: raw.to_string(),
                scheme: "<unparseable>".to_string(),
            });
        }
    };

    // Step 2: scheme allowlist. `url` normalizes schemes to lowercase, so
    // `JAVASCRIPT:` and `File://` cannot slip past a case-sensitive check.
    let scheme = parsed.scheme();
    if !ALLOWED_SCHEMES.contains(&scheme) {
        tracing::warn!(url = raw, scheme = scheme, "navigation target rejected: scheme");
        return Err(BrowserError::DisallowedTarget {
            url: raw.to_string(),
            scheme: scheme.to_string(),
        });
    }

    Ok(())
}
