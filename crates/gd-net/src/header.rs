//! Response status line parsing and status classification.

use crate::transport::io_error;
use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use std::io::BufRead;
use std::io::Read;

/// Status class, taken from the tens digit of the response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Input,
    Success,
    Redirect,
    TemporaryFailure,
    PermanentFailure,
    ClientCertificateRequired,
    Unclassified,
}

impl StatusClass {
    pub fn from_code(code: u8) -> Self {
        match code / 10 {
            1 => Self::Input,
            2 => Self::Success,
            3 => Self::Redirect,
            4 => Self::TemporaryFailure,
            5 => Self::PermanentFailure,
            6 => Self::ClientCertificateRequired,
            _ => Self::Unclassified,
        }
    }
}

/// Parsed `<code> <meta>` response header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    pub code: u8,
    pub meta: String,
}

impl ResponseHeader {
    pub fn new(code: u8, meta: impl Into<String>) -> Self {
        Self {
            code,
            meta: meta.into(),
        }
    }

    pub fn status_class(&self) -> StatusClass {
        StatusClass::from_code(self.code)
    }

    /// Code 11 asks for input that must be masked while typed.
    pub fn is_sensitive_input(&self) -> bool {
        self.code == 11
    }
}

/// Reads exactly one header line from `body`, leaving the content unread.
pub fn read_header<R: BufRead>(body: &mut R, max_meta_bytes: usize) -> DpiResult<ResponseHeader> {
    // two digits, separator, meta, CRLF
    let limit = max_meta_bytes.saturating_add(5);
    let mut line = Vec::with_capacity(64);
    body.by_ref()
        .take(u64::try_from(limit).unwrap_or(u64::MAX))
        .read_until(b'\n', &mut line)
        .map_err(|error| io_error(&error, "failed while reading response header"))?;

    if line.last() != Some(&b'\n') {
        let reason = if line.is_empty() {
            "connection closed before a response header was sent".to_owned()
        } else if line.len() >= limit {
            format!("response header exceeds {limit} bytes")
        } else {
            "response header is not terminated by CRLF".to_owned()
        };
        return Err(DpiError::new(ErrorKind::Header, reason));
    }

    let text = std::str::from_utf8(&line).map_err(|error| {
        DpiError::new(
            ErrorKind::Header,
            format!("response header is not valid UTF-8: {error}"),
        )
    })?;
    let text = text.strip_suffix('\n').unwrap_or(text);
    let text = text.strip_suffix('\r').unwrap_or(text);

    parse_header_line(text, max_meta_bytes)
}

/// Parses a status line with its terminator already removed.
pub fn parse_header_line(line: &str, max_meta_bytes: usize) -> DpiResult<ResponseHeader> {
    let bytes = line.as_bytes();
    let (tens, ones) = match bytes {
        [tens, ones, ..] if tens.is_ascii_digit() && ones.is_ascii_digit() => (*tens, *ones),
        _ => {
            return Err(DpiError::new(
                ErrorKind::Header,
                format!("malformed status line `{line}`: expected a two-digit code"),
            ));
        }
    };
    let code = (tens - b'0') * 10 + (ones - b'0');

    let rest = line.get(2..).unwrap_or_default();
    let meta = match rest.chars().next() {
        None => "",
        Some(' ') | Some('\t') => rest.get(1..).unwrap_or_default(),
        Some(_) => {
            return Err(DpiError::new(
                ErrorKind::Header,
                format!("malformed status line `{line}`: code must be followed by a space"),
            ));
        }
    };

    if meta.len() > max_meta_bytes {
        return Err(DpiError::new(
            ErrorKind::Header,
            format!("response meta exceeds {max_meta_bytes} bytes"),
        ));
    }

    Ok(ResponseHeader::new(code, meta))
}
