//! Markdown to HTML conversion for the report display

use pulldown_cmark::{html, Options, Parser};

/// Blinking cursor appended to every in-progress render
pub const CURSOR_HTML: &str = r#"<span class="cursor"></span>"#;

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

/// Convert Markdown (CommonMark with GFM extensions) to an HTML fragment
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, markdown_options());
    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

/// Render of a report that is still streaming
pub fn render_in_progress(markdown: &str) -> String {
    let mut output = markdown_to_html(markdown);
    output.push_str(CURSOR_HTML);
    output
}

/// Render of a completed report
pub fn render_final(markdown: &str) -> String {
    markdown_to_html(markdown)
}
