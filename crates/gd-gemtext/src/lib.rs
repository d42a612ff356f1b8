//! Gemtext line classification and HTML conversion.

use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use std::io;
use std::io::Read;
use std::io::Write;

const PREFORMAT_TOGGLE: &str = "```";

/// One logical gemtext element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Text(String),
    Link { url: String, label: Option<String> },
    Heading { level: u8, text: String },
    ListItem(String),
    Quote(String),
    Preformatted { alt: Option<String>, lines: Vec<String> },
}

/// Items of one document read from a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Itemized {
    pub items: Vec<Item>,
    /// Invalid UTF-8 sequences were replaced with U+FFFD.
    pub lossy: bool,
}

/// Reads a UTF-8 gemtext document and splits it into items.
pub fn itemize<R: Read>(mut reader: R) -> DpiResult<Itemized> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw).map_err(|error| {
        DpiError::new(
            ErrorKind::Connection,
            format!("failed to read gemtext body: {error}"),
        )
    })?;

    let (text, lossy) = match String::from_utf8(raw) {
        Ok(text) => (text, false),
        Err(error) => (String::from_utf8_lossy(error.as_bytes()).into_owned(), true),
    };

    Ok(Itemized {
        items: itemize_text(&text),
        lossy,
    })
}

/// Splits already-decoded gemtext into items.
pub fn itemize_text(text: &str) -> Vec<Item> {
    let mut items = Vec::new();
    let mut preformatted: Option<(Option<String>, Vec<String>)> = None;

    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(rest) = line.strip_prefix(PREFORMAT_TOGGLE) {
            match preformatted.take() {
                Some((alt, lines)) => items.push(Item::Preformatted { alt, lines }),
                None => preformatted = Some((non_empty(rest), Vec::new())),
            }
            continue;
        }

        if let Some((_, lines)) = preformatted.as_mut() {
            lines.push(line.to_owned());
            continue;
        }

        items.push(classify_line(line));
    }

    if let Some((alt, lines)) = preformatted {
        items.push(Item::Preformatted { alt, lines });
    }

    items
}

fn classify_line(line: &str) -> Item {
    if let Some(rest) = line.strip_prefix("=>") {
        let rest = rest.trim_start();
        let (url, label) = match rest.split_once(char::is_whitespace) {
            Some((url, label)) => (url, non_empty(label.trim())),
            None => (rest, None),
        };
        if !url.is_empty() {
            return Item::Link {
                url: url.to_owned(),
                label,
            };
        }
    }

    for (prefix, level) in [("###", 3), ("##", 2), ("#", 1)] {
        if let Some(rest) = line.strip_prefix(prefix) {
            return Item::Heading {
                level,
                text: rest.trim().to_owned(),
            };
        }
    }

    if let Some(rest) = line.strip_prefix("* ") {
        return Item::ListItem(rest.trim().to_owned());
    }

    if let Some(rest) = line.strip_prefix('>') {
        return Item::Quote(rest.trim().to_owned());
    }

    Item::Text(line.to_owned())
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Writes `items` as an HTML fragment.
pub fn to_html(items: &[Item], out: &mut dyn Write) -> io::Result<()> {
    let mut in_list = false;

    for item in items {
        let is_list_item = matches!(item, Item::ListItem(_));
        if in_list && !is_list_item {
            out.write_all(b"</ul>\n")?;
        }
        if !in_list && is_list_item {
            out.write_all(b"<ul>\n")?;
        }
        in_list = is_list_item;

        match item {
            Item::Text(text) if text.trim().is_empty() => out.write_all(b"<br>\n")?,
            Item::Text(text) => writeln!(out, "<p>{}</p>", escape_html(text))?,
            Item::Link { url, label } => writeln!(
                out,
                "<p><a href='{}'>{}</a></p>",
                escape_html(url),
                escape_html(label.as_deref().unwrap_or(url))
            )?,
            Item::Heading { level, text } => {
                writeln!(out, "<h{level}>{}</h{level}>", escape_html(text))?;
            }
            Item::ListItem(text) => writeln!(out, "<li>{}</li>", escape_html(text))?,
            Item::Quote(text) => writeln!(out, "<blockquote>{}</blockquote>", escape_html(text))?,
            Item::Preformatted { alt, lines } => {
                match alt {
                    Some(alt) => write!(out, "<pre title='{}'>", escape_html(alt))?,
                    None => out.write_all(b"<pre>")?,
                }
                for line in lines {
                    writeln!(out, "{}", escape_html(line))?;
                }
                out.write_all(b"</pre>\n")?;
            }
        }
    }

    if in_list {
        out.write_all(b"</ul>\n")?;
    }

    Ok(())
}

/// Escapes text for use in HTML content and single- or double-quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
