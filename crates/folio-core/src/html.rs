//! Markup stripping for cached document text.
//!
//! Exported document bodies arrive as HTML. The cache stores plain text so
//! substring search matches what a reader sees, not tag soup.

use regex::Regex;

/// Strip markup from an exported document body, leaving searchable text.
///
/// # Rules
///
/// 1. `<script>` and `<style>` elements are removed together with their
///    content (their text is not prose)
/// 2. All remaining tags are removed, keeping the text between them
/// 3. The `&nbsp;` entity is replaced with a plain space
///
/// # Examples
///
/// ```
/// use folio_core::strip_tags;
///
/// assert_eq!(strip_tags("<p>Hello&nbsp;World</p>"), "Hello World");
/// ```
pub fn strip_tags(html: &str) -> String {
    // Step 1: Drop raw-text elements with their content
    let without_raw_text = remove_raw_text_elements(html);

    // Step 2: Drop remaining tags
    let without_tags = remove_tags(&without_raw_text);

    // Step 3: Normalize non-breaking spaces
    replace_nbsp(&without_tags)
}

/// Remove `<script>` and `<style>` elements including their content.
fn remove_raw_text_elements(html: &str) -> String {
    let script_pattern = Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap();
    let style_pattern = Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap();
    let without_scripts = script_pattern.replace_all(html, "");
    style_pattern.replace_all(&without_scripts, "").to_string()
}

/// Remove remaining markup tags, keeping the enclosed text.
fn remove_tags(html: &str) -> String {
    let tag_pattern = Regex::new(r"<[^>]*>").unwrap();
    tag_pattern.replace_all(html, "").to_string()
}

/// Replace the `&nbsp;` entity with a plain space.
fn replace_nbsp(text: &str) -> String {
    text.replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_paragraph_and_nbsp() {
        assert_eq!(strip_tags("<p>Hello&nbsp;World</p>"), "Hello World");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(strip_tags("no markup here"), "no markup here");
    }

    #[test]
    fn test_nested_tags_keep_inner_text() {
        assert_eq!(
            strip_tags("<div><b>Budget</b> report</div>"),
            "Budget report"
        );
    }

    #[test]
    fn test_tags_with_attributes() {
        assert_eq!(
            strip_tags(r#"<a href="https://example.com" target="_blank">link</a>"#),
            "link"
        );
    }

    #[test]
    fn test_script_content_removed() {
        assert_eq!(
            strip_tags("<p>before</p><script>var x = 1;</script><p>after</p>"),
            "beforeafter"
        );
    }

    #[test]
    fn test_style_content_removed() {
        assert_eq!(
            strip_tags("<style>p { color: red; }</style><p>text</p>"),
            "text"
        );
    }

    #[test]
    fn test_script_spanning_lines() {
        let html = "<p>kept</p>\n<script type=\"text/javascript\">\nalert('x');\n</script>";
        assert_eq!(strip_tags(html), "kept\n");
    }

    #[test]
    fn test_multiple_nbsp_entities() {
        assert_eq!(strip_tags("a&nbsp;b&nbsp;c"), "a b c");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(strip_tags(""), "");
    }

    #[test]
    fn test_exported_document_shape() {
        let html = "<html><head><style>.c0{font-weight:700}</style></head>\
                    <body><h1 class=\"c0\">Standard Operating Procedure</h1>\
                    <p>Step&nbsp;1: review the checklist.</p></body></html>";
        assert_eq!(
            strip_tags(html),
            "Standard Operating ProcedureStep 1: review the checklist."
        );
    }
}
