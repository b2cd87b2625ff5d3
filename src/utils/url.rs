//! URL utilities for the content service routes.

/// Normalize a base URL by removing trailing slashes.
///
/// # Examples
///
/// ```
/// use basilisk_chat::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:3000/api"), "http://localhost:3000/api");
/// assert_eq!(normalize_base_url("http://localhost:3000/api//"), "http://localhost:3000/api");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a service base URL and an endpoint path with exactly one slash.
///
/// # Examples
///
/// ```
/// use basilisk_chat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:3000/api/", "/story-prompts/4"),
///     "http://localhost:3000/api/story-prompts/4"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalize_base_url(base_url), endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_only_trailing_slashes() {
        assert_eq!(normalize_base_url("http://svc/api///"), "http://svc/api");
        assert_eq!(normalize_base_url("http://svc"), "http://svc");
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn service_routes_join_cleanly() {
        let base = "http://svc/api/";
        assert_eq!(construct_api_url(base, "prompts"), "http://svc/api/prompts");
        assert_eq!(construct_api_url(base, "prompts/1"), "http://svc/api/prompts/1");
        assert_eq!(construct_api_url("http://svc/api", "//tweets"), "http://svc/api/tweets");
    }
}
