//! Trust-on-first-use decisions.
//!
//! An untrusted or invalid certificate never reaches the renderer. The user
//! gets a confirmation page whose pin link carries the original URL; the pin
//! link stores the presented certificate and redirects back to that URL,
//! which then asks the trust store again. Nothing is remembered here.

use crate::pages;
use gd_config::PluginConfig;
use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use gd_net::GeminiUrl;
use gd_net::ProtocolClient;
use std::io::Write;
use url::Url;

/// Result of one request attempt, split by how the navigator reacts.
#[derive(Debug)]
pub enum TrustOutcome<B> {
    Trusted(B),
    Untrusted(DpiError),
    Invalid(DpiError),
    ConnectionFailed(DpiError),
}

impl<B> TrustOutcome<B> {
    pub fn from_request(result: DpiResult<B>) -> Self {
        match result {
            Ok(body) => Self::Trusted(body),
            Err(error) => match error.kind {
                ErrorKind::UntrustedCert => Self::Untrusted(error),
                ErrorKind::InvalidCert => Self::Invalid(error),
                _ => Self::ConnectionFailed(error),
            },
        }
    }
}

/// Renders the page offering to pin the host of `url`.
pub fn render_pin_confirmation(
    out: &mut dyn Write,
    config: &PluginConfig,
    url: &str,
    reason: &DpiError,
) -> DpiResult<()> {
    let host = Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned());
    let pin_href = format!("{}{url}", config.pin_prefix());

    tracing::info!(url, %host, kind = reason.kind.as_str(), "asking to pin certificate");
    pages::pin_page(out, url, &host, reason, &pin_href).map_err(crate::page_write_error)
}

/// Pins the certificate currently presented by `target`'s host, then sends
/// the host back to `target`.
///
/// A failed pin renders nothing; the caller shows the error page.
pub fn commit_pin<C: ProtocolClient>(
    client: &mut C,
    config: &PluginConfig,
    pin_url: &str,
    target: &str,
    out: &mut dyn Write,
) -> DpiResult<()> {
    let parsed = GeminiUrl::parse(target, &config.scheme, config.default_port)?;
    let host_port = parsed.host_port();

    tracing::info!(%host_port, "pinning certificate");
    client.pin(&host_port)?;

    pages::redirect_page(out, pin_url, target).map_err(crate::page_write_error)
}
