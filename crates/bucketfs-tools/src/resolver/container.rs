//! Zip-packaged document formats (OOXML, XMind).

use std::{
    collections::HashMap,
    io::{Cursor, Read},
};

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use zip::{ZipArchive, result::ZipError};

use crate::error::{Error, Result};

pub(crate) struct Container<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    format: &'static str,
}

impl<'a> Container<'a> {
    pub fn open(content: &'a [u8], format: &'static str) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(content))
            .map_err(|e| Error::conversion(format, format!("not a valid {format} package: {e}")))?;
        Ok(Self { archive, format })
    }

    /// Reads a part as UTF-8, or `None` when the package has no such part.
    pub fn read_optional(&mut self, name: &str) -> Result<Option<String>> {
        let format = self.format;
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(Error::conversion(format, format!("cannot open {name}: {e}"))),
        };
        let mut text = String::new();
        file.read_to_string(&mut text)
            .map_err(|e| Error::conversion(format, format!("cannot read {name}: {e}")))?;
        Ok(Some(text))
    }

    pub fn read(&mut self, name: &str) -> Result<String> {
        self.read_optional(name)?
            .ok_or_else(|| self.error(format!("missing part {name}")))
    }

    pub fn names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Relationship targets of `part`, keyed by relationship id and resolved against the
    /// part's directory.
    pub fn relationships(&mut self, part: &str) -> Result<HashMap<String, String>> {
        let (dir, file) = part.rsplit_once('/').unwrap_or(("", part));
        let rels_name = if dir.is_empty() {
            format!("_rels/{file}.rels")
        } else {
            format!("{dir}/_rels/{file}.rels")
        };
        let Some(xml) = self.read_optional(&rels_name)? else {
            return Ok(HashMap::new());
        };

        let mut reader = Reader::from_str(&xml);
        let mut rels = HashMap::new();
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e))
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    let id = attribute(&e, b"Id");
                    let target = attribute(&e, b"Target");
                    if let (Some(id), Some(target)) = (id, target) {
                        rels.insert(id, resolve_part_path(dir, &target));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(self.error(format!("malformed {rels_name}: {e}"))),
                _ => {}
            }
        }
        Ok(rels)
    }

    pub fn error(&self, message: impl ToString) -> Error {
        Error::conversion(self.format, message)
    }
}

/// Value of the attribute with local name `name`, unescaped.
pub(crate) fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| {
            let raw = String::from_utf8_lossy(&a.value);
            quick_xml::escape::unescape(&raw).ok().map(|v| v.into_owned())
        })
}

/// Joins a relationship target onto the directory of its source part. Absolute targets are
/// rooted at the package.
pub(crate) fn resolve_part_path(base_dir: &str, target: &str) -> String {
    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        base_dir.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
