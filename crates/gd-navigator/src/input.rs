//! Deferred-input continuation.
//!
//! A class 1 response becomes a form whose action is the deferred-input URI
//! for the target. Submitting it arrives here as `<prefix><target>?q=<value>`
//! and is turned back into a follow-up request URL. Browsers submit forms
//! with `+` for space, while the protocol reads a bare `+` literally, so the
//! value is decoded with form rules and re-encoded with `%20` and `%2B`.

use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::percent_decode_str;
use percent_encoding::percent_encode;
use url::Url;

const QUERY_MARKER: &str = "?q=";

/// Bytes left literal when a value is placed into a URL path.
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b'/')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'@');

/// Prompt awaiting a value from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInput {
    /// Requested URL without query or fragment.
    pub target: String,
    pub prompt: String,
    /// Set for status 11; the field is masked.
    pub sensitive: bool,
}

impl PendingInput {
    pub fn new(url: &str, prompt: &str, sensitive: bool) -> Self {
        Self {
            target: strip_query(url),
            prompt: prompt.to_owned(),
            sensitive,
        }
    }

    /// Form action that routes the submission back to the plugin.
    pub fn action(&self, input_prefix: &str) -> String {
        format!("{input_prefix}{}", self.target)
    }
}

fn strip_query(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .to_owned(),
    }
}

/// A submitted deferred-input URI with its prefix removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSubmission {
    pub target: String,
    /// Everything after the first `?q=`, still form-encoded.
    pub raw_query: String,
}

impl InputSubmission {
    pub fn parse(rest: &str) -> DpiResult<Self> {
        let (target, raw_query) = rest.split_once(QUERY_MARKER).ok_or_else(|| {
            DpiError::new(
                ErrorKind::MalformedQuery,
                format!("malformed query: {rest}"),
            )
        })?;

        Ok(Self {
            target: target.to_owned(),
            raw_query: raw_query.to_owned(),
        })
    }

    /// The URL to request with the submitted value.
    pub fn follow_up_url(&self) -> DpiResult<String> {
        let value = decode_query_value(&self.raw_query)?;
        Ok(format!("{}?{}", self.target, encode_query(&value)))
    }
}

/// Decodes a form-encoded value: `+` is a space and every `%` must start a
/// two-digit hex escape.
pub fn decode_query_value(raw: &str) -> DpiResult<Vec<u8>> {
    let bytes = raw.as_bytes();
    for (index, byte) in bytes.iter().enumerate() {
        if *byte != b'%' {
            continue;
        }
        let escape = bytes.get(index + 1..index + 3);
        if !escape.is_some_and(|digits| digits.iter().all(u8::is_ascii_hexdigit)) {
            return Err(DpiError::new(
                ErrorKind::Decode,
                format!("failed to unescape query: invalid escape at byte {index} of `{raw}`"),
            ));
        }
    }

    Ok(percent_decode_str(&raw.replace('+', " ")).collect())
}

/// Encodes `value` for the query of a follow-up request: space becomes
/// `%20` and `+` becomes `%2B`.
pub fn encode_query(value: &[u8]) -> String {
    percent_encode(value, PATH_SAFE)
        .to_string()
        .replace('+', "%2B")
}

#[cfg(test)]
mod tests {
    use super::InputSubmission;
    use super::PendingInput;
    use super::decode_query_value;
    use super::encode_query;
    use gd_core::ErrorKind;
    use rstest::rstest;

    #[test]
    fn plus_survives_the_round_trip() {
        assert_eq!(encode_query(b"a b+c"), "a%20b%2Bc");

        match decode_query_value("a%20b%2Bc") {
            Ok(value) => assert_eq!(value, b"a b+c"),
            Err(error) => panic!("{error}"),
        }
    }

    #[rstest]
    #[case("a+b%2Bc", b"a b+c".as_slice())]
    #[case("caf%C3%A9", "café".as_bytes())]
    #[case("", b"".as_slice())]
    #[case("x%3Fy%26z", b"x?y&z".as_slice())]
    fn decodes_form_values(#[case] raw: &str, #[case] expected: &[u8]) {
        match decode_query_value(raw) {
            Ok(value) => assert_eq!(value, expected),
            Err(error) => panic!("{error}"),
        }
    }

    #[rstest]
    #[case("100%")]
    #[case("%zz")]
    #[case("a%4")]
    fn rejects_broken_escapes(#[case] raw: &str) {
        assert_eq!(
            decode_query_value(raw).map_err(|error| error.kind),
            Err(ErrorKind::Decode)
        );
    }

    #[test]
    fn path_safe_characters_stay_literal() {
        assert_eq!(encode_query(b"a/b:c=d@e&f"), "a/b:c=d@e&f");
        assert_eq!(encode_query(b"what?#"), "what%3F%23");
        assert_eq!(encode_query("café".as_bytes()), "caf%C3%A9");
    }

    #[test]
    fn follow_up_url_reencodes_value() {
        let submission = match InputSubmission::parse("gemini://example.org/search?q=a+b%2Bc") {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        match submission.follow_up_url() {
            Ok(url) => assert_eq!(url, "gemini://example.org/search?a%20b%2Bc"),
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn pending_input_drops_previous_query() {
        let pending = PendingInput::new("gemini://example.org/search?old#frag", "Term", false);
        assert_eq!(pending.target, "gemini://example.org/search");
        assert_eq!(
            pending.action("gemini:input:"),
            "gemini:input:gemini://example.org/search"
        );
    }
}
