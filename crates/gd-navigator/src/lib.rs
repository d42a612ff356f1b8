//! Navigation state machine for one host event.
//!
//! Every `open_url` is classified once at the boundary, then handled
//! synchronously: plain navigations go through request, trust check, header
//! classification and rendering; pin and input URIs recompute a target and
//! redirect back into a plain navigation.

pub mod input;
pub mod intent;
pub mod media;
pub mod outcome;
pub mod pages;
pub mod render;
pub mod trust;

pub use input::InputSubmission;
pub use input::PendingInput;
pub use intent::NavigationIntent;
pub use outcome::NavigationOutcome;
pub use outcome::NavigationReport;
pub use trust::TrustOutcome;

use gd_config::PluginConfig;
use gd_core::DpiError;
use gd_core::ErrorKind;
use gd_dpip::HostCommand;
use gd_dpip::HostEvent;
use gd_net::ProtocolClient;
use gd_net::normalize;
use gd_net::read_header;
use std::io;
use std::io::Write;

/// Handles host events against one protocol client and configuration.
pub struct Navigator<C: ProtocolClient> {
    config: PluginConfig,
    client: C,
}

impl<C: ProtocolClient> Navigator<C> {
    pub fn new(config: PluginConfig, client: C) -> Self {
        Self { config, client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Processes one host event, writing any page to `out`.
    ///
    /// Teardown is not handled here: the event loop must exit as soon as it
    /// sees [`HostCommand::Bye`].
    pub fn handle_event(&mut self, event: &HostEvent, out: &mut dyn Write) -> NavigationReport {
        match &event.command {
            HostCommand::OpenUrl { url } => self.open_url(url, out),
            HostCommand::Auth => {
                tracing::debug!("ignoring auth tag");
                NavigationReport::not_handled()
            }
            HostCommand::Bye => NavigationReport::not_handled(),
            HostCommand::Other(command) => {
                tracing::debug!(%command, "ignoring unknown host command");
                NavigationReport::not_handled()
            }
        }
    }

    pub fn open_url(&mut self, raw: &str, out: &mut dyn Write) -> NavigationReport {
        let intent = match NavigationIntent::classify(raw, &self.config) {
            Ok(value) => value,
            Err(error) => return fail(out, raw, error),
        };

        match intent {
            NavigationIntent::Navigate(url) => self.navigate(&url, out),
            NavigationIntent::PinCommit { target } => {
                match trust::commit_pin(&mut self.client, &self.config, raw, &target, out) {
                    Ok(()) => NavigationReport::handled(),
                    Err(error) => fail(out, raw, error),
                }
            }
            NavigationIntent::InputSubmit(submission) => {
                let redirected = submission
                    .follow_up_url()
                    .and_then(|next| pages::redirect_page(out, raw, &next).map_err(page_write_error));
                match redirected {
                    Ok(()) => NavigationReport::handled(),
                    Err(error) => fail(out, raw, error),
                }
            }
        }
    }

    fn navigate(&mut self, raw: &str, out: &mut dyn Write) -> NavigationReport {
        let url = match normalize(raw) {
            Ok(value) => value,
            Err(error) => return fail(out, raw, error),
        };
        tracing::debug!(%url, "navigating");

        // The body owns the connection and is dropped on every return below.
        let mut body = match TrustOutcome::from_request(self.client.request(&url)) {
            TrustOutcome::Trusted(body) => body,
            TrustOutcome::Untrusted(reason) | TrustOutcome::Invalid(reason) => {
                return match trust::render_pin_confirmation(out, &self.config, &url, &reason) {
                    Ok(()) => NavigationReport::handled(),
                    Err(error) => NavigationReport::failed(error),
                };
            }
            TrustOutcome::ConnectionFailed(error) => return fail(out, &url, error),
        };

        let header = match read_header(&mut body, self.config.max_meta_bytes) {
            Ok(value) => value,
            Err(error) => return fail(out, &url, error),
        };

        let mut warnings = Vec::new();
        let rendered =
            render::render_response(out, &self.config, &url, &header, &mut body, &mut warnings);
        for warning in &warnings {
            tracing::warn!(%url, %warning, "navigation warning");
        }

        let report = match rendered {
            Ok(()) => NavigationReport::handled(),
            Err(error) => fail(out, &url, error),
        };
        report.with_warnings(warnings)
    }
}

/// Renders the error page for `url` and reports the failure.
fn fail(out: &mut dyn Write, url: &str, error: DpiError) -> NavigationReport {
    tracing::error!(url, %error, "navigation failed");
    if let Err(write_error) = pages::error_page(out, url, &error) {
        tracing::error!(url, %write_error, "failed to write error page");
    }
    NavigationReport::failed(error)
}

pub(crate) fn page_write_error(error: io::Error) -> DpiError {
    DpiError::new(ErrorKind::Host, format!("failed to write page: {error}"))
}
