use thiserror::Error;

/// Failure modes of one search invocation. A legitimate empty result is
/// not an error; it surfaces as `SearchOutcome::NoResults`.
#[derive(Debug, Error)]
pub enum SearchError {
    /// An element the portal is expected to render never appeared within
    /// the implicit-wait window. During navigation this means the page
    /// shape changed or the site is unreachable; it is never retried.
    #[error("expected page element not found: {what}")]
    ElementNotFound { what: String },

    /// The CAPTCHA retry budget was spent without the challenge element
    /// ever disappearing. The session is torn down before this propagates.
    #[error("CAPTCHA not resolved after {attempts} attempt(s)")]
    CaptchaExhausted { attempts: u32 },

    #[error("webdriver error: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    pub fn element_not_found(what: impl Into<String>) -> Self {
        SearchError::ElementNotFound { what: what.into() }
    }
}
