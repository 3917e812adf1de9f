//! Presentations to a slide/shape/paragraph structure.

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use serde::Serialize;

use super::container::{Container, attribute};
use crate::error::Result;

const FORMAT: &str = "pptx";
const PRESENTATION_PART: &str = "ppt/presentation.xml";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presentation {
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slide {
    /// 1-based position in the deck.
    pub number: usize,
    pub shapes: Vec<Shape>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Shape {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub paragraphs: Vec<String>,
}

pub fn read_presentation(content: &[u8]) -> Result<Presentation> {
    let mut container = Container::open(content, FORMAT)?;

    let mut slides = Vec::new();
    for (index, part) in slide_parts(&mut container)?.into_iter().enumerate() {
        let xml = container.read(&part)?;
        let shapes = parse_shapes(&xml)
            .map_err(|e| container.error(format!("malformed {part}: {e}")))?;
        slides.push(Slide {
            number: index + 1,
            shapes,
            notes: read_notes(&mut container, &part)?,
        });
    }

    Ok(Presentation { slides })
}

/// Slide parts in deck order: the `sldIdLst` of the presentation part, or the numeric suffix
/// of `ppt/slides/slideN.xml` when that list is unavailable.
fn slide_parts(container: &mut Container<'_>) -> Result<Vec<String>> {
    if let Some(xml) = container.read_optional(PRESENTATION_PART)? {
        let ids = slide_relationship_ids(&xml)
            .map_err(|e| container.error(format!("malformed {PRESENTATION_PART}: {e}")))?;
        let rels = container.relationships(PRESENTATION_PART)?;
        let parts: Vec<String> = ids.iter().filter_map(|id| rels.get(id).cloned()).collect();
        if !parts.is_empty() {
            return Ok(parts);
        }
    }

    let mut numbered: Vec<(u32, String)> = container
        .names()
        .into_iter()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse()
                .ok()?;
            Some((number, name))
        })
        .collect();
    numbered.sort();
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

fn slide_relationship_ids(xml: &str) -> std::result::Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                // `r:id` names the relationship; the unprefixed `id` is a numeric slide id.
                let rel = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.prefix().is_some() && a.key.local_name().as_ref() == b"id");
                if let Some(rel) = rel {
                    ids.push(String::from_utf8_lossy(&rel.value).into_owned());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

fn read_notes(container: &mut Container<'_>, slide_part: &str) -> Result<Vec<String>> {
    let rels = container.relationships(slide_part)?;
    let Some(notes_part) = rels.values().find(|target| target.contains("/notesSlides/")) else {
        return Ok(Vec::new());
    };
    let notes_part = notes_part.clone();
    let Some(xml) = container.read_optional(&notes_part)? else {
        return Ok(Vec::new());
    };
    let shapes = parse_shapes(&xml)
        .map_err(|e| container.error(format!("malformed {notes_part}: {e}")))?;
    Ok(shapes
        .into_iter()
        .filter(|s| s.placeholder.as_deref() == Some("body"))
        .flat_map(|s| s.paragraphs)
        .collect())
}

/// Shapes with at least one non-empty paragraph, in document order.
fn parse_shapes(xml: &str) -> std::result::Result<Vec<Shape>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut shapes = Vec::new();
    let mut current: Option<Shape> = None;
    let mut paragraph: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sp" | b"graphicFrame" => current = Some(Shape::default()),
                b"p" if current.is_some() => paragraph = Some(String::new()),
                b"t" => in_text = true,
                _ => describe_shape(current.as_mut(), &e),
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"br" => {
                    if let Some(p) = paragraph.as_mut() {
                        p.push('\n');
                    }
                }
                _ => describe_shape(current.as_mut(), &e),
            },
            Event::Text(t) if in_text => {
                if let Some(p) = paragraph.as_mut() {
                    p.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if let (Some(shape), Some(text)) = (current.as_mut(), paragraph.take()) {
                        let text = text.trim();
                        if !text.is_empty() {
                            shape.paragraphs.push(text.to_string());
                        }
                    }
                }
                b"sp" | b"graphicFrame" => {
                    if let Some(shape) = current.take() {
                        if !shape.paragraphs.is_empty() {
                            shapes.push(shape);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(shapes)
}

fn describe_shape(shape: Option<&mut Shape>, e: &BytesStart<'_>) {
    let Some(shape) = shape else {
        return;
    };
    match e.local_name().as_ref() {
        b"cNvPr" if shape.name.is_empty() => {
            shape.name = attribute(e, b"name").unwrap_or_default();
        }
        // A placeholder without a type is a body placeholder.
        b"ph" => {
            shape.placeholder = Some(attribute(e, b"type").unwrap_or_else(|| "body".to_string()));
        }
        _ => {}
    }
}
