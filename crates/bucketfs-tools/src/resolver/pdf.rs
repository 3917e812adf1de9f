use crate::error::{Error, Result};

const FORMAT: &str = "pdf";

/// Text layer of a PDF, page by page.
pub fn extract_text(content: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(content).map_err(|e| Error::conversion(FORMAT, e))
}

/// Scanned documents extract to nothing but page-break newlines.
pub fn has_text_layer(text: &str) -> bool {
    text.chars().any(|c| c != '\n')
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_extraction_means_no_text_layer() {
        assert!(!has_text_layer(""));
        assert!(!has_text_layer("\n\n\n"));
        assert!(has_text_layer("\n\nInvoice 42\n"));
    }

    #[test]
    fn only_newlines_count_as_blank() {
        assert!(has_text_layer("  \t "));
        assert!(has_text_layer("\r\n"));
    }

    #[test]
    fn extracts_drawn_text() {
        let pdf = testing::build_pdf("BT /F1 12 Tf 72 712 Td (Invoice 42) Tj ET");
        let text = extract_text(&pdf).unwrap();
        let compact: String = text.split_whitespace().collect();
        assert!(compact.contains("Invoice42"), "{text:?}");
        assert!(has_text_layer(&text));
    }

    #[test]
    fn page_without_text_has_no_text_layer() {
        let text = extract_text(&testing::build_pdf("")).unwrap();
        assert!(!has_text_layer(&text), "{text:?}");
    }

    #[test]
    fn garbage_is_a_conversion_error() {
        let err = extract_text(b"%PDF-1.4 truncated").unwrap_err();
        assert!(matches!(err, Error::Conversion { ref format, .. } if format == "pdf"));
    }
}
