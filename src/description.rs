use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("malformed description markup at byte {position}: {source}")]
    Markup {
        position: u64,
        source: quick_xml::Error,
    },

    #[error(
        "malformed description markup at byte {position}: expected </{expected}>, found </{found}>"
    )]
    MismatchedEnd {
        position: u64,
        expected: String,
        found: String,
    },

    #[error("malformed description markup at byte {position}: unexpected </{found}>")]
    UnexpectedEnd { position: u64, found: String },

    #[error("malformed description markup: unterminated <{open}>")]
    Unterminated { open: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeTextDocument {
    pub headings: Vec<String>,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub text: String,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    pub href: String,
}

/// Elements the catalog emits without a closing tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "wbr", "input", "meta", "link", "col"];

/// What the open-element stack is currently collecting into.
enum Capture {
    Heading(String),
    Paragraph(Paragraph),
}

/// Parses a catalog description (HTML-like markup) into headings and
/// paragraphs.
///
/// `<h1>`..`<h6>` become headings and `<p>` becomes a paragraph; the text of
/// any inline element inside a paragraph (links included) is part of the
/// paragraph text, and `<a>` elements are also recorded as links. Anything
/// else is ignored. Unbalanced tags fail the whole parse.
pub fn parse_description(raw: &str) -> Result<FreeTextDocument, DescriptionError> {
    let mut reader = Reader::from_str(raw);
    // Nesting is tracked here so void elements like `<br>` can be skipped.
    reader.config_mut().check_end_names = false;

    let mut doc = FreeTextDocument::default();
    let mut open: Vec<String> = Vec::new();
    let mut capture: Option<(usize, Capture)> = None;
    let mut link: Option<(usize, Link)> = None;

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|source| DescriptionError::Markup { position, source })?;

        match event {
            Event::Start(start) => {
                let name = element_name(&start);
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    push_break(&mut capture, &name);
                    continue;
                }
                open.push(name.clone());
                let depth = open.len();

                if capture.is_none() {
                    if is_heading(&name) {
                        capture = Some((depth, Capture::Heading(String::new())));
                    } else if name == "p" {
                        capture = Some((depth, Capture::Paragraph(Paragraph::default())));
                    }
                } else if name == "a"
                    && link.is_none()
                    && matches!(capture, Some((_, Capture::Paragraph(_))))
                {
                    let href = start
                        .try_get_attribute("href")
                        .map_err(|err| DescriptionError::Markup {
                            position,
                            source: err.into(),
                        })?
                        .map(|attr| attr.unescape_value().map(|v| v.into_owned()))
                        .transpose()
                        .map_err(|source| DescriptionError::Markup { position, source })?
                        .unwrap_or_default();
                    link = Some((
                        depth,
                        Link {
                            text: String::new(),
                            href,
                        },
                    ));
                }
            }
            Event::Empty(start) => {
                let name = element_name(&start);
                push_break(&mut capture, &name);
            }
            Event::End(end) => {
                let found = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                let Some(expected) = open.pop() else {
                    return Err(DescriptionError::UnexpectedEnd { position, found });
                };
                if expected != found {
                    return Err(DescriptionError::MismatchedEnd {
                        position,
                        expected,
                        found,
                    });
                }
                let depth = open.len() + 1;

                if link.as_ref().is_some_and(|(d, _)| *d == depth) {
                    if let (Some((_, finished)), Some((_, Capture::Paragraph(para)))) =
                        (link.take(), capture.as_mut())
                    {
                        para.links.push(finished);
                    }
                }
                if capture.as_ref().is_some_and(|(d, _)| *d == depth) {
                    match capture.take() {
                        Some((_, Capture::Heading(text))) => doc.headings.push(text),
                        Some((_, Capture::Paragraph(para))) => doc.paragraphs.push(para),
                        None => {}
                    }
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape_with(resolve_entity)
                    .map_err(|source| DescriptionError::Markup { position, source })?;
                append_text(&mut capture, &mut link, &text);
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                append_text(&mut capture, &mut link, &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = open.pop() {
        return Err(DescriptionError::Unterminated { open });
    }

    Ok(doc)
}

/// Joins paragraph texts with newlines and trims the result. No paragraphs
/// means an empty summary.
pub fn summarize(doc: &FreeTextDocument) -> String {
    doc.paragraphs
        .iter()
        .map(|para| para.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase()
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn push_break(capture: &mut Option<(usize, Capture)>, name: &str) {
    if name != "br" {
        return;
    }
    match capture {
        Some((_, Capture::Paragraph(para))) => para.text.push('\n'),
        Some((_, Capture::Heading(text))) => text.push(' '),
        None => {}
    }
}

fn append_text(
    capture: &mut Option<(usize, Capture)>,
    link: &mut Option<(usize, Link)>,
    text: &str,
) {
    match capture {
        Some((_, Capture::Paragraph(para))) => para.text.push_str(text),
        Some((_, Capture::Heading(heading))) => heading.push_str(text),
        None => return,
    }
    if let Some((_, link)) = link {
        link.text.push_str(text);
    }
}

fn resolve_entity(entity: &str) -> Option<&'static str> {
    resolve_predefined_entity(entity).or(match entity {
        "nbsp" => Some("\u{a0}"),
        "ndash" => Some("\u{2013}"),
        "mdash" => Some("\u{2014}"),
        "hellip" => Some("\u{2026}"),
        "lsquo" => Some("\u{2018}"),
        "rsquo" => Some("\u{2019}"),
        "ldquo" => Some("\u{201c}"),
        "rdquo" => Some("\u{201d}"),
        "copy" => Some("\u{a9}"),
        "eacute" => Some("\u{e9}"),
        _ => None,
    })
}
