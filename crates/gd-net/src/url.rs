//! URL normalization and validation contracts.

use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use url::Host;
use url::Url;

/// Canonicalizes `input` into the string used as navigation and trust key.
///
/// Normalizing twice yields the same string as normalizing once.
pub fn normalize(input: &str) -> DpiResult<String> {
    let mut parsed = parse_generic(input)?;

    // RFC 3986 6.2.3: an authority with an empty path is equivalent to "/".
    // The parser already drops a trailing ':' with no port digits.
    if parsed.has_host() && parsed.path().is_empty() {
        parsed.set_path("/");
    }

    Ok(parsed.into())
}

fn parse_generic(input: &str) -> DpiResult<Url> {
    Url::parse(input).map_err(|error| {
        DpiError::new(
            ErrorKind::Parse,
            format!("failed to parse URL `{input}`: {error}"),
        )
    })
}

/// Validated request target for the protocol client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiUrl {
    parsed: Url,
    host: String,
    port: u16,
}

impl GeminiUrl {
    pub fn parse(input: &str, scheme: &str, default_port: u16) -> DpiResult<Self> {
        let parsed = parse_generic(input)?;

        if !parsed.scheme().eq_ignore_ascii_case(scheme) {
            return Err(DpiError::new(
                ErrorKind::Parse,
                format!(
                    "unsupported scheme `{}` (expected `{scheme}`)",
                    parsed.scheme()
                ),
            ));
        }

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(DpiError::new(
                ErrorKind::Parse,
                "URL userinfo (`username:password@`) is not allowed",
            ));
        }

        let host = match parsed.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_ascii_lowercase(),
            Some(Host::Ipv4(address)) => address.to_string(),
            Some(Host::Ipv6(address)) => address.to_string(),
            _ => {
                return Err(DpiError::new(ErrorKind::Parse, "URL must include a host"));
            }
        };

        let port = parsed.port().unwrap_or(default_port);

        Ok(Self { parsed, host, port })
    }

    pub fn as_str(&self) -> &str {
        self.parsed.as_str()
    }

    /// Host without IPv6 brackets, suitable for TLS server names.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` key used by the trust store.
    pub fn host_port(&self) -> String {
        join_host_port(&self.host, self.port)
    }
}

/// Formats a `host:port` pair, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Splits a `host:port` pair produced by [`join_host_port`].
pub fn split_host_port(value: &str) -> DpiResult<(String, u16)> {
    let invalid = || {
        DpiError::new(
            ErrorKind::Parse,
            format!("invalid host:port pair `{value}`"),
        )
    };

    let (host, port) = value.rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(invalid());
    }

    Ok((host.to_ascii_lowercase(), port))
}
