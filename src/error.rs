use reqwest::StatusCode;

/// Errors produced by the source plugins and the two core engines
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// No reader images could be recovered for a chapter
    #[error("This chapter could not be loaded: no pages were found")]
    PagesNotFound,

    /// An embedded constant or pattern failed to decode at startup
    #[error("Invalid embedded constant `{name}`: {reason}")]
    Configuration { name: String, reason: String },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },

    #[error("Cloudflare challenge at {url}; open the site in a browser to solve it")]
    Cloudflare { url: String },

    #[error("Access to {url} is forbidden; the title may have been removed")]
    Forbidden { url: String },

    #[error("Malformed JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Chapter is locked: {0}")]
    Locked(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Unknown discover section: {0}")]
    UnknownSection(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;

impl SourceError {
    pub(crate) fn config(name: &str, reason: impl Into<String>) -> Self {
        SourceError::Configuration {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the same request at the network layer could help
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Http(e) => e.is_timeout() || e.is_connect(),
            SourceError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            SourceError::Cloudflare { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_not_found_message_is_user_facing() {
        let msg = SourceError::PagesNotFound.to_string();
        assert!(msg.contains("could not be loaded"));
    }

    #[test]
    fn test_configuration_error_names_constant() {
        let err = SourceError::config("stage[2].seed", "expected 32 bytes, got 31");
        let msg = err.to_string();
        assert!(msg.contains("stage[2].seed"));
        assert!(msg.contains("32 bytes"));
    }

    #[test]
    fn test_transient_classification() {
        let busy = SourceError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            url: "https://example.org".into(),
        };
        assert!(busy.is_transient());
        let gone = SourceError::Status {
            status: StatusCode::NOT_FOUND,
            url: "https://example.org".into(),
        };
        assert!(!gone.is_transient());
        assert!(!SourceError::PagesNotFound.is_transient());
    }
}
