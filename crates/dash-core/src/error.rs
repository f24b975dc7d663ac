use std::time::Duration;

use thiserror::Error;

/// All errors produced by the dashboard pipeline.
#[derive(Error, Debug)]
pub enum DashError {
    /// A sharing link did not contain a recognisable file id.
    #[error("Unrecognised source URL: {0}")]
    Resolution(String),

    /// A network or transport error while downloading a source.
    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// The remote server answered with a non-success status.
    #[error("Fetching {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The fetch did not complete within the caller-supplied deadline.
    #[error("Fetching {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    /// The downloaded text is not well-formed CSV.
    #[error("Failed to parse CSV: {0}")]
    CsvParse(String),

    /// No platform schema is registered for a logical file name.
    #[error("No schema registered for {0}")]
    MissingSchema(String),

    /// The dashboard configuration has no source URL for a file.
    #[error("No source configured for {0}")]
    MissingSource(String),

    /// A date range whose start lies after its end.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: String, end: String },

    /// A date string did not match any recognised format.
    #[error("Invalid date: {0}")]
    DateParse(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the dashboard crates.
pub type Result<T> = std::result::Result<T, DashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_resolution() {
        let err = DashError::Resolution("https://example.com/x".to_string());
        assert_eq!(
            err.to_string(),
            "Unrecognised source URL: https://example.com/x"
        );
    }

    #[test]
    fn test_error_display_http_status() {
        let err = DashError::HttpStatus {
            url: "https://host/file.csv".to_string(),
            status: 404,
        };
        let msg = err.to_string();
        assert!(msg.contains("HTTP 404"));
        assert!(msg.contains("https://host/file.csv"));
    }

    #[test]
    fn test_error_display_timeout() {
        let err = DashError::Timeout {
            url: "https://host/a".to_string(),
            after: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "Fetching https://host/a timed out after 10s");
    }

    #[test]
    fn test_error_display_sub_second_timeout() {
        let err = DashError::Timeout {
            url: "https://host/a".to_string(),
            after: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "Fetching https://host/a timed out after 250ms");
    }

    #[test]
    fn test_error_display_invalid_range() {
        let err = DashError::InvalidDateRange {
            start: "2024-02-01".to_string(),
            end: "2024-01-01".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid date range: 2024-02-01 is after 2024-01-01"
        );
    }

    #[test]
    fn test_error_display_missing_schema() {
        let err = DashError::MissingSchema("Mystery.csv".to_string());
        assert_eq!(err.to_string(), "No schema registered for Mystery.csv");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: DashError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: DashError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
