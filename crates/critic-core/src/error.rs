use std::path::PathBuf;

/// Everything that can stop or degrade a review run.
///
/// Fetch, parse and submit failures abort the run; completion failures are
/// caught inside the pipeline and never escape as this type.
///
/// # Examples
///
/// ```
/// use critic_core::CriticError;
///
/// let err = CriticError::Event("no pull request number".into());
/// assert_eq!(err.to_string(), "invalid event payload: no pull request number");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CriticError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Missing credentials or an unusable setting.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The webhook payload is not a usable pull request event.
    #[error("invalid event payload: {0}")]
    Event(String),

    /// The unified diff could not be parsed.
    #[error("malformed diff: {0}")]
    Parse(String),

    /// The completion endpoint failed or answered with an unexpected body.
    #[error("completion request failed: {0}")]
    Llm(String),

    /// A GitHub REST call failed.
    #[error("GitHub request failed: {0}")]
    GitHub(String),

    #[error("invalid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// A file named on the command line does not exist.
    #[error("{} does not exist", .0.display())]
    FileNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_pass_through() {
        let err: CriticError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "event.json: denied").into();
        assert_eq!(err.to_string(), "event.json: denied");
    }

    #[test]
    fn github_failure_names_the_host() {
        let err = CriticError::GitHub("422 Unprocessable Entity".into());
        assert_eq!(err.to_string(), "GitHub request failed: 422 Unprocessable Entity");
    }

    #[test]
    fn missing_event_file_names_the_path() {
        let err = CriticError::FileNotFound(PathBuf::from("/github/workflow/event.json"));
        assert_eq!(err.to_string(), "/github/workflow/event.json does not exist");
    }

    #[test]
    fn toml_errors_convert() {
        let toml_err = toml::from_str::<toml::Table>("[llm").unwrap_err();
        let err = CriticError::from(toml_err);
        assert!(err.to_string().starts_with("invalid config file"));
    }
}
