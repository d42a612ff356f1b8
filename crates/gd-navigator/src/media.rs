//! Declared media types of success responses.

use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;

pub const GEMTEXT: &str = "text/gemini";
const DEFAULT_CHARSET: &str = "utf-8";
const ACCEPTED_CHARSETS: [&str; 2] = ["us-ascii", "utf-8"];

/// `type/subtype` with lower-cased parameter names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub essence: String,
    pub params: Vec<(String, String)>,
}

impl MediaType {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Lower-cased charset; responses without one are UTF-8.
    pub fn charset(&self) -> String {
        self.param("charset")
            .unwrap_or(DEFAULT_CHARSET)
            .to_ascii_lowercase()
    }

    pub fn has_supported_charset(&self) -> bool {
        ACCEPTED_CHARSETS.contains(&self.charset().as_str())
    }

    pub fn is_gemtext(&self) -> bool {
        self.essence == GEMTEXT
    }
}

/// Parses the meta of a success header. An empty meta means
/// `text/gemini; charset=utf-8`.
pub fn parse_media_type(meta: &str) -> DpiResult<MediaType> {
    let invalid = |reason: &str| {
        DpiError::new(
            ErrorKind::Header,
            format!("failed to parse media type `{meta}`: {reason}"),
        )
    };

    let meta = meta.trim();
    if meta.is_empty() {
        return Ok(MediaType {
            essence: GEMTEXT.to_owned(),
            params: vec![("charset".to_owned(), DEFAULT_CHARSET.to_owned())],
        });
    }

    let mut parts = meta.split(';');
    let essence = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    let valid_essence = essence
        .split_once('/')
        .is_some_and(|(kind, subtype)| is_token(kind) && is_token(subtype));
    if !valid_essence {
        return Err(invalid("expected `type/subtype`"));
    }

    let mut params = Vec::new();
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (name, value) = part
            .split_once('=')
            .ok_or_else(|| invalid("parameter without `=`"))?;
        let name = name.trim().to_ascii_lowercase();
        if !is_token(&name) {
            return Err(invalid("invalid parameter name"));
        }
        let value = value.trim();
        let value = match value.strip_prefix('"') {
            Some(quoted) => quoted
                .strip_suffix('"')
                .ok_or_else(|| invalid("unterminated quoted value"))?,
            None => value,
        };
        if params.iter().any(|(existing, _)| *existing == name) {
            return Err(invalid("duplicate parameter"));
        }
        params.push((name, value.to_owned()));
    }

    Ok(MediaType { essence, params })
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|byte| byte.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&byte))
}
