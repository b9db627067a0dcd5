use thiserror::Error;

pub type BrowserResult<T> = Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chrome launch failed: {0}")]
    Launch(String),
    #[error("chrome protocol error: {0}")]
    Protocol(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("timeout waiting for {0}")]
    Timeout(String),
    #[error("no element matches {0}")]
    ElementNotFound(String),
    #[error("browser session lost: {0}")]
    SessionLost(String),
    #[error("unexpected script result: {0}")]
    Script(String),
}

impl BrowserError {
    /// Wraps an error surfaced by headless_chrome
    pub fn protocol(err: anyhow::Error) -> Self {
        BrowserError::Protocol(format!("{err:#}"))
    }

    /// The browser itself is gone, not just one page or element
    pub fn is_session_loss(&self) -> bool {
        matches!(self, BrowserError::SessionLost(_) | BrowserError::Launch(_))
    }

    pub fn navigation(url: &str, err: impl std::fmt::Display) -> Self {
        BrowserError::Navigation {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}
