use std::fmt;

pub const MIME_MSWORD: &str = "application/msword";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_XLS: &str = "application/vnd.ms-excel";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_PPT: &str = "application/vnd.ms-powerpoint";
pub const MIME_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_XMIND: &str = "application/vnd.xmind.workbook";

/// The conversion strategy for a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Image,
    Audio,
    Text,
    Word,
    Spreadsheet,
    Presentation,
    Pdf,
    MindMap,
    Unsupported,
}

impl FileKind {
    /// Picks the strategy from the declared MIME type, falling back to the filename for
    /// markdown and XMind. Rules are checked in order and the first match wins; matching is
    /// case-sensitive.
    pub fn classify(mime_type: &str, filename: &str) -> Self {
        if mime_type.starts_with("image/") {
            FileKind::Image
        } else if mime_type.starts_with("audio/") {
            FileKind::Audio
        } else if mime_type == "text/plain"
            || mime_type.starts_with("text/")
            || filename.ends_with(".md")
        {
            FileKind::Text
        } else if mime_type == MIME_MSWORD || mime_type == MIME_DOCX {
            FileKind::Word
        } else if mime_type == MIME_XLS || mime_type == MIME_XLSX {
            FileKind::Spreadsheet
        } else if mime_type == MIME_PPT || mime_type == MIME_PPTX {
            FileKind::Presentation
        } else if mime_type == MIME_PDF {
            FileKind::Pdf
        } else if mime_type == MIME_XMIND || filename.ends_with(".xmind") {
            FileKind::MindMap
        } else {
            FileKind::Unsupported
        }
    }

    /// Whether the conversion runs a document decoder, as opposed to tagging or decoding
    /// the bytes directly.
    pub fn needs_decoder(self) -> bool {
        matches!(
            self,
            FileKind::Word
                | FileKind::Spreadsheet
                | FileKind::Presentation
                | FileKind::Pdf
                | FileKind::MindMap
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Audio => "audio",
            FileKind::Text => "text",
            FileKind::Word => "word",
            FileKind::Spreadsheet => "spreadsheet",
            FileKind::Presentation => "presentation",
            FileKind::Pdf => "pdf",
            FileKind::MindMap => "xmind",
            FileKind::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
