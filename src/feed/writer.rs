use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use std::path::Path;
use thiserror::Error;

use super::model::{Channel, Item};
use crate::util::strip_control_chars;

/// The XML writer rejected an event.
///
/// Writing into an in-memory buffer with a fixed document shape should never
/// fail; if it does the feed is unusable and nothing is written to disk.
#[derive(Debug, Error)]
#[error("Failed to encode feed: {0}")]
pub struct EncodeError(String);

fn xml_err(e: impl std::fmt::Display) -> EncodeError {
    EncodeError(e.to_string())
}

/// Writes `<name>text</name>`, escaping the text.
///
/// The text event is written even when empty so the closing tag stays on the
/// same line as the opening one.
fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), EncodeError> {
    let text = strip_control_chars(text);
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new(&text)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)?;
    Ok(())
}

fn write_item<W: Write>(writer: &mut Writer<W>, item: &Item) -> Result<(), EncodeError> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .map_err(xml_err)?;
    write_text_element(writer, "title", item.title())?;
    write_text_element(writer, "link", item.link())?;
    write_text_element(writer, "description", item.description())?;
    write_text_element(writer, "guid", item.guid())?;
    write_text_element(writer, "pubDate", item.pub_date())?;
    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .map_err(xml_err)?;
    Ok(())
}

/// Encodes a channel as an RSS 2.0 document.
///
/// Output is UTF-8, starts with the XML declaration and uses two-space
/// indentation. Encoding is pure: the same channel always yields the same
/// bytes, and items keep their input order.
///
/// All text is escaped here, so sources hand over raw strings.
pub fn encode(channel: &Channel) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(rss)).map_err(xml_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .map_err(xml_err)?;

    write_text_element(&mut writer, "title", &channel.title)?;
    write_text_element(&mut writer, "link", &channel.link)?;
    write_text_element(&mut writer, "description", &channel.description)?;

    for item in &channel.items {
        write_item(&mut writer, item)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .map_err(xml_err)?;

    let mut bytes = writer.into_inner().into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

/// Replaces `path` with `contents` atomically.
///
/// Writes to a uniquely named temporary file next to the destination, syncs
/// it, then renames it into place. Readers never observe a half-written
/// feed, and a failed write leaves the previous file untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(
        ".{}.{}.{:016x}.tmp",
        file_name,
        std::process::id(),
        nanos
    ));

    let result = (|| {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        drop(file);

        // Windows refuses to rename over an existing file
        #[cfg(windows)]
        if path.exists() {
            std::fs::remove_file(path)?;
        }

        std::fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}
