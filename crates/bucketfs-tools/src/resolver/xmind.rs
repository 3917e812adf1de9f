//! XMind workbooks to a tree of topics.
//!
//! Current XMind files carry `content.json`; XMind 8 and earlier carry `content.xml`. Both
//! are read into the same [`MindMap`].

use quick_xml::{Reader, events::Event};
use serde::{Deserialize, Serialize};

use super::container::{Container, attribute};
use crate::error::{Error, Result};

const FORMAT: &str = "xmind";

/// Deepest topic nesting accepted from `content.xml`. Matches serde_json's recursion limit,
/// which bounds the `content.json` path.
const MAX_TOPIC_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MindMap {
    pub sheets: Vec<MindSheet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MindSheet {
    pub title: String,
    pub root_topic: Topic,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Topic {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Topic>,
}

pub fn read_mind_map(content: &[u8]) -> Result<MindMap> {
    let mut container = Container::open(content, FORMAT)?;

    if let Some(json) = container.read_optional("content.json")? {
        let sheets: Vec<RawSheet> = serde_json::from_str(&json)
            .map_err(|e| container.error(format!("malformed content.json: {e}")))?;
        return Ok(MindMap {
            sheets: sheets.into_iter().map(MindSheet::from).collect(),
        });
    }

    let Some(xml) = container.read_optional("content.xml")? else {
        return Err(container.error("missing content.json or content.xml"));
    };
    Ok(MindMap {
        sheets: parse_xml(&xml)?,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSheet {
    #[serde(default)]
    title: String,
    root_topic: RawTopic,
}

#[derive(Deserialize)]
struct RawTopic {
    #[serde(default)]
    title: String,
    #[serde(default)]
    children: RawChildren,
    notes: Option<RawNotes>,
    #[serde(default)]
    labels: Vec<String>,
    href: Option<String>,
}

#[derive(Default, Deserialize)]
struct RawChildren {
    #[serde(default)]
    attached: Vec<RawTopic>,
    #[serde(default)]
    detached: Vec<RawTopic>,
}

#[derive(Deserialize)]
struct RawNotes {
    plain: Option<RawPlain>,
}

#[derive(Deserialize)]
struct RawPlain {
    content: String,
}

impl From<RawSheet> for MindSheet {
    fn from(raw: RawSheet) -> Self {
        MindSheet {
            title: raw.title,
            root_topic: raw.root_topic.into(),
        }
    }
}

impl From<RawTopic> for Topic {
    fn from(raw: RawTopic) -> Self {
        let RawChildren { attached, detached } = raw.children;
        Topic {
            title: raw.title,
            notes: raw.notes.and_then(|n| n.plain).map(|p| p.content),
            labels: raw.labels,
            href: raw.href,
            children: attached.into_iter().chain(detached).map(Topic::from).collect(),
        }
    }
}

fn parse_xml(xml: &str) -> Result<Vec<MindSheet>> {
    let malformed =
        |e: quick_xml::Error| Error::conversion(FORMAT, format!("malformed content.xml: {e}"));
    let mut reader = Reader::from_str(xml);
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut topics: Vec<Topic> = Vec::new();
    let mut sheet_title = String::new();
    let mut root: Option<Topic> = None;
    let mut sheets = Vec::new();

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"sheet" => {
                        sheet_title.clear();
                        root = None;
                    }
                    b"topic" => {
                        if topics.len() == MAX_TOPIC_DEPTH {
                            return Err(Error::conversion(FORMAT, "mind map nested too deeply"));
                        }
                        topics.push(Topic {
                            href: attribute(&e, b"href"),
                            ..Topic::default()
                        });
                    }
                    _ => {}
                }
                path.push(name);
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(malformed)?;
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                let parent = path.len().checked_sub(2).map(|i| path[i].as_slice());
                match (parent, path.last().map(Vec::as_slice)) {
                    (Some(b"sheet"), Some(b"title")) => sheet_title.push_str(text),
                    (Some(b"topic"), Some(b"title")) => {
                        if let Some(topic) = topics.last_mut() {
                            topic.title.push_str(text);
                        }
                    }
                    (Some(b"notes"), Some(b"plain")) => {
                        if let Some(topic) = topics.last_mut() {
                            topic.notes.get_or_insert_with(String::new).push_str(text);
                        }
                    }
                    (Some(b"labels"), Some(b"label")) => {
                        if let Some(topic) = topics.last_mut() {
                            topic.labels.push(text.to_string());
                        }
                    }
                    _ => {}
                }
            }
            Event::End(e) => {
                match e.local_name().as_ref() {
                    b"topic" => {
                        if let Some(topic) = topics.pop() {
                            match topics.last_mut() {
                                Some(parent) => parent.children.push(topic),
                                None => root = Some(topic),
                            }
                        }
                    }
                    b"sheet" => {
                        if let Some(root_topic) = root.take() {
                            sheets.push(MindSheet {
                                title: std::mem::take(&mut sheet_title),
                                root_topic,
                            });
                        }
                    }
                    _ => {}
                }
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sheets)
}
