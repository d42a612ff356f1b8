//! Generated documents. Every page shares one skeleton and is preceded by
//! the host's start-of-content marker.

use gd_core::DpiError;
use gd_dpip::start_send_page;
use gd_gemtext::escape_html;
use std::io;
use std::io::Write;

pub const BODY_ID: &str = "gemini-plugin-body";
pub const HTML: &str = "text/html";

fn document(
    out: &mut dyn Write,
    url: &str,
    title: &str,
    head_extra: &str,
    body: impl FnOnce(&mut dyn Write) -> io::Result<()>,
) -> io::Result<()> {
    start_send_page(out, url, HTML)?;
    out.write_all(b"<!DOCTYPE html>\n<html>\n<head>\n<meta charset='utf-8'>\n")?;
    writeln!(out, "<title>{}</title>", escape_html(title))?;
    out.write_all(head_extra.as_bytes())?;
    writeln!(out, "</head>\n<body id='{BODY_ID}'>")?;
    body(out)?;
    out.write_all(b"</body>\n</html>\n")
}

/// Converted content, titled with the page URL.
pub fn content_page(
    out: &mut dyn Write,
    url: &str,
    notices: &[String],
    fragment: impl FnOnce(&mut dyn Write) -> io::Result<()>,
) -> io::Result<()> {
    document(out, url, url, "", |out| {
        for notice in notices {
            writeln!(
                out,
                "<p class='gemini-plugin-notice'><b>{}</b></p>",
                escape_html(notice)
            )?;
        }
        out.write_all(b"<div>\n")?;
        fragment(out)?;
        out.write_all(b"</div>\n")
    })
}

/// Immediate refresh to `to`; following it is left to the host.
pub fn redirect_page(out: &mut dyn Write, from: &str, to: &str) -> io::Result<()> {
    let refresh = format!(
        "<meta http-equiv='Refresh' content='0; url={}'>\n",
        escape_html(to)
    );
    document(out, from, &format!("Redirecting to {to}"), &refresh, |_| Ok(()))
}

/// Confirmation page offering to pin `host` and continue to `url`.
pub fn pin_page(
    out: &mut dyn Write,
    url: &str,
    host: &str,
    reason: &DpiError,
    pin_href: &str,
) -> io::Result<()> {
    document(out, url, &format!("Pin {url}"), "", |out| {
        out.write_all(b"<h2>Suspicious or unknown certificate</h2>\n")?;
        writeln!(out, "<p><b>{}</b></p>", escape_html(&reason.message))?;
        writeln!(
            out,
            "<p><a href='{}'>Pin {} and continue</a></p>",
            escape_html(pin_href),
            escape_html(host)
        )
    })
}

pub fn error_page(out: &mut dyn Write, url: &str, error: &DpiError) -> io::Result<()> {
    document(out, url, "Error", "", |out| {
        writeln!(out, "<h2>Error on {}</h2>", escape_html(url))?;
        writeln!(out, "<p><b>error: {}</b></p>", escape_html(&error.to_string()))
    })
}

/// Prompt whose form submits to the deferred-input `action`.
pub fn input_page(
    out: &mut dyn Write,
    url: &str,
    action: &str,
    prompt: &str,
    sensitive: bool,
) -> io::Result<()> {
    let input_type = if sensitive { "password" } else { "text" };
    document(out, url, url, "", |out| {
        out.write_all(b"<div>\n")?;
        writeln!(out, "<form action='{}' method='get'>", escape_html(action))?;
        writeln!(out, "<label for='q'>{}</label><br>", escape_html(prompt))?;
        writeln!(out, "<input type='{input_type}' id='q' name='q'><br>")?;
        out.write_all(b"<input type='submit' value='Submit'>\n</form>\n</div>\n")
    })
}

/// Literal status text for responses with no dedicated presentation.
pub fn status_page(out: &mut dyn Write, url: &str, code: u8, meta: &str) -> io::Result<()> {
    start_send_page(out, url, "text/plain")?;
    writeln!(out, "{code:02} {meta}")
}

#[cfg(test)]
mod tests {
    use super::error_page;
    use super::input_page;
    use super::pin_page;
    use super::redirect_page;
    use super::status_page;
    use gd_core::DpiError;
    use gd_core::ErrorKind;

    fn capture(render: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>) -> String {
        let mut out = Vec::new();
        if let Err(error) = render(&mut out) {
            panic!("{error}");
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    fn every_page_uses_the_shared_skeleton() {
        let error = DpiError::new(ErrorKind::Connection, "refused");
        let pages = [
            capture(|out| redirect_page(out, "gemini://a/", "gemini://b/")),
            capture(|out| pin_page(out, "gemini://a/", "a", &error, "gemini:pin:gemini://a/")),
            capture(|out| error_page(out, "gemini://a/", &error)),
            capture(|out| input_page(out, "gemini://a/", "gemini:input:gemini://a/", "?", false)),
        ];

        for page in pages {
            assert!(page.starts_with("<cmd='start_send_page' url='gemini://a/' '>"));
            assert!(page.contains("Content-Type: text/html\r\n\r\n<!DOCTYPE html>"));
            assert!(page.contains("<body id='gemini-plugin-body'>"));
            assert!(page.ends_with("</html>\n"));
        }
    }

    #[test]
    fn error_page_escapes_url_and_message() {
        let error = DpiError::new(ErrorKind::Connection, "<b>bad</b> & worse");
        let page = capture(|out| error_page(out, "gemini://a/<x>", &error));
        assert!(page.contains("Error on gemini://a/&lt;x&gt;"));
        assert!(page.contains("&lt;b&gt;bad&lt;/b&gt; &amp; worse"));
        assert!(!page.contains("<b>bad</b>"));
    }

    #[test]
    fn redirect_page_refreshes_immediately() {
        let page = capture(|out| redirect_page(out, "gemini://a/", "gemini://b/?x=1&y=2"));
        assert!(page.contains("<meta http-equiv='Refresh' content='0; url=gemini://b/?x=1&amp;y=2'>"));
        assert!(page.contains("<title>Redirecting to gemini://b/?x=1&amp;y=2</title>"));
    }

    #[test]
    fn sensitive_input_is_masked() {
        let page = capture(|out| input_page(out, "gemini://a/", "gemini:input:gemini://a/", "Password", true));
        assert!(page.contains("<input type='password' id='q' name='q'>"));
        assert!(page.contains("<form action='gemini:input:gemini://a/' method='get'>"));
    }

    #[test]
    fn status_page_is_plain_text() {
        let page = capture(|out| status_page(out, "gemini://a/", 51, "Not found"));
        assert!(page.ends_with("Content-Type: text/plain\r\n\r\n51 Not found\n"));
    }
}
