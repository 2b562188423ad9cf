use url::Url;

/// Predicate deciding whether a string is an acceptable destination URL.
pub trait UrlValidator: Send + Sync + 'static {
    fn is_valid(&self, url: &str) -> bool;
}

/// Accepts any absolute URL, whatever its scheme.
///
/// Relative references such as `/path` or `example.com` are rejected
/// because they have no scheme to anchor them.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsoluteUrlValidator;

impl UrlValidator for AbsoluteUrlValidator {
    fn is_valid(&self, url: &str) -> bool {
        Url::parse(url).is_ok()
    }
}

impl<F> UrlValidator for F
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    fn is_valid(&self, url: &str) -> bool {
        self(url)
    }
}
