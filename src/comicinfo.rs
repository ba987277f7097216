use std::path::Path;

use quick_xml::SeError;
use quick_xml::escape::escape;
use quick_xml::events::{BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::{self, ArchiveError};

/// Name of the metadata entry at the top level of an archive.
pub const COMIC_INFO_ENTRY: &str = "ComicInfo.xml";

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";

#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("decode ComicInfo.xml: {0}")]
    Decode(#[from] quick_xml::DeError),

    #[error("encode ComicInfo.xml: {0}")]
    Encode(#[from] SeError),

    #[error("ComicInfo.xml is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Canonical metadata record stored as `ComicInfo.xml`.
///
/// Credit fields hold comma-joined person names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "ComicInfo")]
pub struct ComicInfo {
    #[serde(rename = "Title", default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(rename = "Series", default, skip_serializing_if = "String::is_empty")]
    pub series: String,
    #[serde(rename = "Number", default, skip_serializing_if = "String::is_empty")]
    pub number: String,
    #[serde(rename = "Summary", default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(rename = "Year", default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(rename = "Month", default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(rename = "Day", default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(rename = "Writer", default, skip_serializing_if = "String::is_empty")]
    pub writer: String,
    #[serde(rename = "Penciller", default, skip_serializing_if = "String::is_empty")]
    pub penciller: String,
    #[serde(rename = "Inker", default, skip_serializing_if = "String::is_empty")]
    pub inker: String,
    #[serde(rename = "Colorist", default, skip_serializing_if = "String::is_empty")]
    pub colorist: String,
    #[serde(
        rename = "Letterer",
        alias = "letterer",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub letterer: String,
    #[serde(rename = "CoverArtist", default, skip_serializing_if = "String::is_empty")]
    pub cover_artist: String,
    #[serde(rename = "Editor", default, skip_serializing_if = "String::is_empty")]
    pub editor: String,
    #[serde(rename = "Publisher", default, skip_serializing_if = "String::is_empty")]
    pub publisher: String,
    #[serde(rename = "Genre", default, skip_serializing_if = "String::is_empty")]
    pub genre: String,
    #[serde(rename = "PageCount", default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(rename = "LanguageISO", default, skip_serializing_if = "String::is_empty")]
    pub language_iso: String,
    #[serde(
        rename = "Pages",
        default,
        with = "pages_xml",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub pages: Vec<Page>,
}

/// One `<Page>` descriptor. Everything except `Image` is omitted when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "@Image")]
    pub image: String,
    #[serde(rename = "@Type", default, skip_serializing_if = "String::is_empty")]
    pub page_type: String,
    #[serde(rename = "@DoublePage", default, skip_serializing_if = "is_false")]
    pub double_page: bool,
    #[serde(rename = "@ImageSize", default, skip_serializing_if = "is_zero_u64")]
    pub image_size: u64,
    #[serde(rename = "@Key", default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(rename = "@ImageWidth", default, skip_serializing_if = "is_zero_u32")]
    pub image_width: u32,
    #[serde(rename = "@ImageHeight", default, skip_serializing_if = "is_zero_u32")]
    pub image_height: u32,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero_u32(value: &u32) -> bool {
    *value == 0
}

fn is_zero_u64(value: &u64) -> bool {
    *value == 0
}

/// `<Pages><Page .../>...</Pages>` wrapper around a flat `Vec<Page>`.
mod pages_xml {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Page;

    #[derive(Serialize)]
    struct PagesOut<'a> {
        #[serde(rename = "Page")]
        page: &'a [Page],
    }

    #[derive(Deserialize)]
    struct PagesIn {
        #[serde(rename = "Page", default)]
        page: Vec<Page>,
    }

    pub fn serialize<S: Serializer>(pages: &[Page], serializer: S) -> Result<S::Ok, S::Error> {
        PagesOut { page: pages }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Page>, D::Error> {
        Ok(PagesIn::deserialize(deserializer)?.page)
    }
}

impl ComicInfo {
    pub fn to_xml(&self) -> Result<String, SeError> {
        let mut body = String::new();
        let mut serializer = quick_xml::se::Serializer::new(&mut body);
        serializer.indent(' ', 2);
        self.serialize(serializer)?;

        let mut xml = String::from(XML_DECLARATION);
        xml.push_str(&keep_edge_whitespace(&body)?);
        xml.push('\n');
        Ok(xml)
    }

    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_str(xml)
    }
}

/// What XML readers strip from the edges of element text.
fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn push_char_refs(out: &mut String, chars: &str) {
    for c in chars.chars() {
        out.push_str(&format!("&#{};", u32::from(c)));
    }
}

/// Escapes element text, spelling leading and trailing whitespace as
/// character references so a trimming reader hands it back intact.
fn escape_text(value: &str) -> String {
    let body = value.trim_matches(is_xml_space);
    let mut out = String::with_capacity(value.len());
    if body.is_empty() {
        push_char_refs(&mut out, value);
        return out;
    }
    let lead = value.len() - value.trim_start_matches(is_xml_space).len();
    let tail = value.trim_end_matches(is_xml_space).len();
    push_char_refs(&mut out, &value[..lead]);
    out.push_str(&escape(body));
    push_char_refs(&mut out, &value[tail..]);
    out
}

/// Rewrites the text of every leaf element with [`escape_text`]. Indentation
/// between elements is copied as is.
fn keep_edge_whitespace(xml: &str) -> Result<String, SeError> {
    let mut reader = Reader::from_str(xml);
    let mut events = Vec::new();
    loop {
        match reader
            .read_event()
            .map_err(|err| SeError::Custom(err.to_string()))?
        {
            Event::Eof => break,
            event => events.push(event),
        }
    }

    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    for (idx, event) in events.iter().enumerate() {
        let is_leaf_text = idx > 0
            && matches!(events[idx - 1], Event::Start(_))
            && matches!(events.get(idx + 1), Some(Event::End(_)));
        match event {
            Event::Text(text) if is_leaf_text => {
                let value = text
                    .unescape()
                    .map_err(|err| SeError::Custom(err.to_string()))?;
                writer.write_event(Event::Text(BytesText::from_escaped(escape_text(&value))))?;
            }
            other => writer.write_event(other.clone())?,
        }
    }
    String::from_utf8(writer.into_inner()).map_err(|err| SeError::from(err.utf8_error()))
}

/// Reads the record embedded in the archive at `path`.
///
/// `Ok(None)` means the archive opened fine but carries no `ComicInfo.xml`.
pub fn read_record(path: &Path) -> Result<Option<ComicInfo>, RecordError> {
    let Some(bytes) = archive::read_entry(path, COMIC_INFO_ENTRY)? else {
        return Ok(None);
    };
    let xml = String::from_utf8(bytes)?;
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(&xml);
    Ok(Some(ComicInfo::from_xml(xml)?))
}

/// Replaces the archive's `ComicInfo.xml` with `record` as a whole unit.
pub fn write_record(path: &Path, record: &ComicInfo) -> Result<(), RecordError> {
    let xml = record.to_xml()?;
    archive::replace_entry(path, COMIC_INFO_ENTRY, xml.as_bytes())?;
    tracing::debug!(
        archive = %path.display(),
        series = %record.series,
        number = %record.number,
        "record written"
    );
    Ok(())
}
