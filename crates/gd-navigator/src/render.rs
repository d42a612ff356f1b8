//! Presentation of trusted, classified responses.

use crate::input::PendingInput;
use crate::media::MediaType;
use crate::media::parse_media_type;
use crate::page_write_error;
use crate::pages;
use encoding_rs::Encoding;
use gd_config::PluginConfig;
use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use gd_dpip::start_send_page;
use gd_gemtext::itemize;
use gd_gemtext::itemize_text;
use gd_gemtext::to_html;
use gd_net::ResponseHeader;
use gd_net::StatusClass;
use std::io;
use std::io::BufRead;
use std::io::Read;
use std::io::Write;
use url::Url;

/// Writes the page for `header` and the remaining `body`.
///
/// Non-fatal problems are appended to `warnings`; an error means nothing
/// useful was rendered and the caller should show an error page.
pub fn render_response<B: BufRead>(
    out: &mut dyn Write,
    config: &PluginConfig,
    url: &str,
    header: &ResponseHeader,
    body: &mut B,
    warnings: &mut Vec<DpiError>,
) -> DpiResult<()> {
    let class = header.status_class();
    tracing::debug!(url, code = header.code, ?class, "classified response");

    match class {
        StatusClass::Input => {
            let pending = PendingInput::new(url, &header.meta, header.is_sensitive_input());
            pages::input_page(
                out,
                url,
                &pending.action(&config.input_prefix()),
                &pending.prompt,
                pending.sensitive,
            )
            .map_err(page_write_error)
        }
        StatusClass::Success => render_content(out, url, header, body, warnings),
        StatusClass::Redirect => {
            let target = resolve_redirect(url, &header.meta)?;
            pages::redirect_page(out, url, &target).map_err(page_write_error)
        }
        StatusClass::TemporaryFailure
        | StatusClass::PermanentFailure
        | StatusClass::ClientCertificateRequired
        | StatusClass::Unclassified => {
            pages::status_page(out, url, header.code, &header.meta).map_err(page_write_error)
        }
    }
}

fn render_content<B: BufRead>(
    out: &mut dyn Write,
    url: &str,
    header: &ResponseHeader,
    body: &mut B,
    warnings: &mut Vec<DpiError>,
) -> DpiResult<()> {
    let media = parse_media_type(&header.meta)?;

    let mut notices = Vec::new();
    if !media.has_supported_charset() {
        let warning = DpiError::new(
            ErrorKind::UnsupportedEncoding,
            format!("unsupported encoding: {}", media.charset()),
        );
        tracing::warn!(url, charset = %media.charset(), "rendering with unsupported charset");
        notices.push(warning.to_string());
        warnings.push(warning);
    }

    if !media.is_gemtext() {
        start_send_page(out, url, &header.meta).map_err(page_write_error)?;
        io::copy(body, out).map_err(|error| {
            DpiError::new(
                ErrorKind::Connection,
                format!("failed to write content: {error}"),
            )
        })?;
        return Ok(());
    }

    let items = if media.has_supported_charset() {
        let itemized = itemize(body)?;
        if itemized.lossy {
            let warning = DpiError::new(
                ErrorKind::UnsupportedEncoding,
                format!("body is not valid {}; invalid bytes were replaced", media.charset()),
            );
            tracing::warn!(url, charset = %media.charset(), "replaced invalid bytes in gemtext");
            notices.push(warning.to_string());
            warnings.push(warning);
        }
        itemized.items
    } else {
        itemize_text(&decode_best_effort(body, &media)?)
    };

    pages::content_page(out, url, &notices, |out| to_html(&items, out)).map_err(page_write_error)
}

fn decode_best_effort<R: Read>(body: &mut R, media: &MediaType) -> DpiResult<String> {
    let mut raw = Vec::new();
    body.read_to_end(&mut raw).map_err(|error| {
        DpiError::new(
            ErrorKind::Connection,
            format!("failed to read content: {error}"),
        )
    })?;

    let text = match Encoding::for_label(media.charset().as_bytes()) {
        Some(encoding) => encoding.decode(&raw).0.into_owned(),
        None => String::from_utf8_lossy(&raw).into_owned(),
    };
    Ok(text)
}

/// Resolves a redirect target against the current URL.
fn resolve_redirect(url: &str, meta: &str) -> DpiResult<String> {
    let meta = meta.trim();
    if meta.is_empty() {
        return Err(DpiError::new(
            ErrorKind::Header,
            "redirect response does not name a target",
        ));
    }

    let resolved = Url::parse(url)
        .and_then(|base| base.join(meta))
        .map(String::from)
        .unwrap_or_else(|_| meta.to_owned());
    Ok(resolved)
}
