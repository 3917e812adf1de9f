//! Word documents to Markdown.
//!
//! The main document part is rendered to a small HTML subset (headings, paragraphs, bold and
//! italic runs, bulleted lists, tables) which html2md turns into Markdown.

use quick_xml::{Reader, escape::escape, events::Event};

use super::container::{Container, attribute};
use crate::error::Result;

const FORMAT: &str = "docx";
const DOCUMENT_PART: &str = "word/document.xml";

/// Converts a `.docx` package to Markdown.
pub fn to_markdown(content: &[u8]) -> Result<String> {
    let html = to_html(content)?;
    Ok(html2md::parse_html(&html).trim().to_string())
}

pub fn to_html(content: &[u8]) -> Result<String> {
    let mut container = Container::open(content, FORMAT)?;
    let xml = container.read(DOCUMENT_PART)?;
    render(&xml).map_err(|e| container.error(format!("malformed {DOCUMENT_PART}: {e}")))
}

#[derive(Default)]
struct Paragraph {
    heading: Option<u8>,
    list_item: bool,
    body: String,
}

#[derive(Default, Clone, Copy)]
struct RunStyle {
    bold: bool,
    italic: bool,
}

#[derive(Default)]
struct Renderer {
    html: String,
    paragraph: Option<Paragraph>,
    run: RunStyle,
    run_text: String,
    in_paragraph_props: bool,
    in_text: bool,
    table_depth: usize,
    list_open: bool,
}

fn render(xml: &str) -> std::result::Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut r = Renderer::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => r.start_paragraph(),
                b"pPr" => r.in_paragraph_props = true,
                b"r" => r.run = RunStyle::default(),
                b"t" => r.in_text = true,
                b"b" | b"i" => r.toggle(e.local_name().as_ref(), attribute(&e, b"val")),
                b"pStyle" => r.set_style(attribute(&e, b"val")),
                b"numPr" => r.mark_list_item(),
                b"tbl" => r.start_table(),
                b"tr" => r.html.push_str("<tr>"),
                b"tc" => r.html.push_str("<td>"),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"b" | b"i" => r.toggle(e.local_name().as_ref(), attribute(&e, b"val")),
                b"pStyle" => r.set_style(attribute(&e, b"val")),
                b"br" | b"cr" => r.run_text.push_str("<br/>"),
                // Inside pPr a tab is a tab-stop definition.
                b"tab" if !r.in_paragraph_props => r.run_text.push(' '),
                _ => {}
            },
            Event::Text(t) if r.in_text => {
                let text = t.unescape()?;
                r.run_text.push_str(&escape(text.as_ref()));
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => r.in_text = false,
                b"pPr" => r.in_paragraph_props = false,
                b"r" => r.finish_run(),
                b"p" => r.finish_paragraph(),
                b"tc" => r.html.push_str("</td>"),
                b"tr" => r.html.push_str("</tr>"),
                b"tbl" => {
                    r.table_depth = r.table_depth.saturating_sub(1);
                    r.html.push_str("</table>");
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    r.close_list();
    Ok(r.html)
}

impl Renderer {
    fn start_paragraph(&mut self) {
        self.paragraph = Some(Paragraph::default());
    }

    fn toggle(&mut self, name: &[u8], val: Option<String>) {
        // Run properties inside pPr describe the paragraph mark, not visible text.
        if self.in_paragraph_props {
            return;
        }
        let on = !matches!(val.as_deref(), Some("0" | "false" | "off" | "none"));
        match name {
            b"b" => self.run.bold = on,
            _ => self.run.italic = on,
        }
    }

    fn set_style(&mut self, style: Option<String>) {
        let (Some(paragraph), Some(style)) = (self.paragraph.as_mut(), style) else {
            return;
        };
        if let Some(level) = heading_level(&style) {
            paragraph.heading = Some(level);
        } else if style.starts_with("List") {
            paragraph.list_item = true;
        }
    }

    fn mark_list_item(&mut self) {
        if let Some(paragraph) = self.paragraph.as_mut() {
            paragraph.list_item = true;
        }
    }

    fn finish_run(&mut self) {
        let text = std::mem::take(&mut self.run_text);
        let Some(paragraph) = self.paragraph.as_mut() else {
            return;
        };
        if text.trim().is_empty() {
            paragraph.body.push_str(&text);
            return;
        }
        let RunStyle { bold, italic } = self.run;
        if bold {
            paragraph.body.push_str("<strong>");
        }
        if italic {
            paragraph.body.push_str("<em>");
        }
        paragraph.body.push_str(&text);
        if italic {
            paragraph.body.push_str("</em>");
        }
        if bold {
            paragraph.body.push_str("</strong>");
        }
    }

    fn finish_paragraph(&mut self) {
        let Some(paragraph) = self.paragraph.take() else {
            return;
        };
        let body = paragraph.body.trim();
        if body.is_empty() {
            return;
        }

        if self.table_depth > 0 {
            self.html.push_str(body);
            self.html.push(' ');
            return;
        }

        if paragraph.list_item && paragraph.heading.is_none() {
            if !self.list_open {
                self.html.push_str("<ul>");
                self.list_open = true;
            }
            self.html.push_str(&format!("<li>{body}</li>"));
            return;
        }

        self.close_list();
        match paragraph.heading {
            Some(level) => self.html.push_str(&format!("<h{level}>{body}</h{level}>")),
            None => self.html.push_str(&format!("<p>{body}</p>")),
        }
    }

    fn start_table(&mut self) {
        if self.table_depth == 0 {
            self.close_list();
        }
        self.table_depth += 1;
        self.html.push_str("<table>");
    }

    fn close_list(&mut self) {
        if self.list_open {
            self.html.push_str("</ul>");
            self.list_open = false;
        }
    }
}

/// `Title` and `Heading1`..`Heading6` (any case, optional space) map to heading levels.
fn heading_level(style: &str) -> Option<u8> {
    if style.eq_ignore_ascii_case("title") {
        return Some(1);
    }
    let lower = style.to_ascii_lowercase();
    let level = lower.strip_prefix("heading")?.trim().parse::<u8>().ok()?;
    (1..=6).contains(&level).then_some(level)
}
