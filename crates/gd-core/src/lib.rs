//! Shared primitives used across gemini-dpi crates.

use core::fmt;

/// Result alias used across the workspace.
pub type DpiResult<T> = Result<T, DpiError>;

/// Failure categories surfaced by a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed URI.
    Parse,
    /// Certificate is not pinned, or differs from the pinned one.
    UntrustedCert,
    /// Certificate failed validity checks (expired, wrong name, ...).
    InvalidCert,
    Connection,
    Timeout,
    /// Malformed response status line.
    Header,
    UnsupportedEncoding,
    /// Deferred-input submission without the `?q=` marker.
    MalformedQuery,
    Decode,
    Storage,
    Config,
    Host,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "url.parse",
            Self::UntrustedCert => "tls.untrusted",
            Self::InvalidCert => "tls.invalid",
            Self::Connection => "net.connection",
            Self::Timeout => "net.timeout",
            Self::Header => "gemini.header",
            Self::UnsupportedEncoding => "content.unsupported_encoding",
            Self::MalformedQuery => "input.malformed_query",
            Self::Decode => "input.decode",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Host => "host",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for the plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DpiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for DpiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DpiError {}

#[cfg(test)]
mod tests {
    use super::DpiError;
    use super::ErrorKind;

    #[test]
    fn display_includes_kind_code() {
        let error = DpiError::new(ErrorKind::Header, "status line too short");
        assert_eq!(error.to_string(), "gemini.header: status line too short");
    }

    #[test]
    fn kind_codes_are_distinct() {
        let kinds = [
            ErrorKind::Parse,
            ErrorKind::UntrustedCert,
            ErrorKind::InvalidCert,
            ErrorKind::Connection,
            ErrorKind::Timeout,
            ErrorKind::Header,
            ErrorKind::UnsupportedEncoding,
            ErrorKind::MalformedQuery,
            ErrorKind::Decode,
            ErrorKind::Storage,
            ErrorKind::Config,
            ErrorKind::Host,
        ];
        let codes: std::collections::HashSet<&str> = kinds.iter().map(|kind| kind.as_str()).collect();
        assert_eq!(codes.len(), kinds.len());
    }
}
