//! Host plugin tag codec and event definitions.
//!
//! The host speaks in tags of the form `<cmd='open_url' url='...' '>`.
//! Attribute values are single-quoted; a literal quote inside a value is
//! written twice.

use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use std::io;
use std::io::BufRead;
use std::io::Write;

pub const DEFAULT_MAX_TAG_BYTES: usize = 64 * 1024;
const QUOTE: u8 = b'\'';

pub const CMD_OPEN_URL: &str = "open_url";
pub const CMD_BYE: &str = "DpiBye";
pub const CMD_AUTH: &str = "auth";
pub const CMD_START_SEND_PAGE: &str = "start_send_page";

/// Ordered attribute list of one tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DpipTag {
    attributes: Vec<(String, String)>,
}

impl DpipTag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Encodes the tag in host wire form.
    pub fn encode(&self) -> String {
        let mut out = String::from("<");
        for (name, value) in &self.attributes {
            out.push_str(name);
            out.push_str("='");
            out.push_str(&value.replace('\'', "''"));
            out.push_str("' ");
        }
        out.push_str("'>");
        out
    }
}

/// Commands the plugin reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    OpenUrl { url: String },
    /// Lifecycle teardown; the process must exit immediately.
    Bye,
    Auth,
    Other(String),
}

/// One incoming host event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEvent {
    pub command: HostCommand,
    pub tag: DpipTag,
}

impl HostEvent {
    pub fn from_tag(tag: DpipTag) -> DpiResult<Self> {
        let cmd = tag
            .get("cmd")
            .ok_or_else(|| DpiError::new(ErrorKind::Host, "host tag has no `cmd` attribute"))?;

        let command = match cmd {
            CMD_OPEN_URL => {
                let url = tag.get("url").ok_or_else(|| {
                    DpiError::new(ErrorKind::Host, "`open_url` tag has no `url` attribute")
                })?;
                HostCommand::OpenUrl {
                    url: url.to_owned(),
                }
            }
            CMD_BYE => HostCommand::Bye,
            CMD_AUTH => HostCommand::Auth,
            other => HostCommand::Other(other.to_owned()),
        };

        Ok(Self { command, tag })
    }

    pub fn open_url(url: &str) -> Self {
        Self {
            command: HostCommand::OpenUrl {
                url: url.to_owned(),
            },
            tag: DpipTag::new().with("cmd", CMD_OPEN_URL).with("url", url),
        }
    }
}

/// Reads one complete tag from `reader`.
///
/// Returns `Ok(None)` when the stream ends before any byte of a new tag.
pub fn read_tag<R: BufRead>(reader: &mut R, max_tag_bytes: usize) -> DpiResult<Option<DpipTag>> {
    let mut buffer = Vec::new();

    loop {
        let read = reader.read_until(b'>', &mut buffer).map_err(|error| {
            DpiError::new(
                ErrorKind::Host,
                format!("failed while reading host tag: {error}"),
            )
        })?;

        if read == 0 {
            if buffer.iter().all(u8::is_ascii_whitespace) {
                return Ok(None);
            }
            return Err(DpiError::new(
                ErrorKind::Host,
                "host stream ended inside a tag",
            ));
        }

        if buffer.len() > max_tag_bytes {
            return Err(DpiError::new(
                ErrorKind::Host,
                format!("host tag exceeds {max_tag_bytes} bytes"),
            ));
        }

        if let Some(end) = find_tag_end(&buffer) {
            let text = std::str::from_utf8(&buffer[..end]).map_err(|error| {
                DpiError::new(
                    ErrorKind::Host,
                    format!("host tag is not valid UTF-8: {error}"),
                )
            })?;
            return parse_tag(text).map(Some);
        }
    }
}

/// Index just past the `'>` terminator, if the buffer holds a whole tag.
fn find_tag_end(buffer: &[u8]) -> Option<usize> {
    let mut in_value = false;
    let mut index = 0_usize;

    while let Some(&byte) = buffer.get(index) {
        let next = buffer.get(index + 1).copied();
        if in_value {
            if byte == QUOTE {
                if next == Some(QUOTE) {
                    index += 2;
                    continue;
                }
                in_value = false;
            }
        } else if byte == QUOTE {
            let opens_value = index > 0 && buffer.get(index - 1) == Some(&b'=');
            if !opens_value && next == Some(b'>') {
                return Some(index + 2);
            }
            in_value = true;
        }
        index += 1;
    }

    None
}

/// Parses the textual form of one tag.
pub fn parse_tag(input: &str) -> DpiResult<DpipTag> {
    let malformed = |reason: &str| {
        DpiError::new(
            ErrorKind::Host,
            format!("malformed host tag `{input}`: {reason}"),
        )
    };

    let trimmed = input.trim();
    let mut rest = trimmed
        .strip_prefix('<')
        .ok_or_else(|| malformed("missing `<`"))?;
    let mut tag = DpipTag::new();

    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("'>") {
            if !after.trim().is_empty() {
                return Err(malformed("trailing bytes after terminator"));
            }
            return Ok(tag);
        }

        let (name, after_name) = rest
            .split_once("='")
            .ok_or_else(|| malformed("expected `name='value'`"))?;
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(malformed("invalid attribute name"));
        }

        let (value, after_value) = read_quoted_value(after_name)
            .ok_or_else(|| malformed("unterminated attribute value"))?;
        tag.attributes.push((name.to_owned(), value));
        rest = after_value;
    }
}

fn read_quoted_value(input: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = input.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        if ch != '\'' {
            value.push(ch);
            continue;
        }

        if matches!(chars.peek(), Some((_, '\''))) {
            chars.next();
            value.push('\'');
            continue;
        }

        return Some((value, input.get(index + 1..).unwrap_or_default()));
    }

    None
}

/// Writes the start-of-content marker that precedes every page.
pub fn start_send_page(out: &mut dyn Write, url: &str, content_type: &str) -> io::Result<()> {
    let tag = DpipTag::new()
        .with("cmd", CMD_START_SEND_PAGE)
        .with("url", url);
    out.write_all(tag.encode().as_bytes())?;
    write!(out, "Content-Type: {content_type}\r\n\r\n")
}
