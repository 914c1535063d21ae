//! Markdown → HTML conversion for the publish body.
//!
//! The manage endpoint accepts raw HTML; the generator produces markdown.

use pulldown_cmark::{Options, Parser, html};

/// Render a markdown document to HTML.
#[must_use]
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_and_emphasis_render() {
        let html = markdown_to_html("# 제목\n\n**bold** and *italic*");
        assert!(html.contains("<h1>제목</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
    }

    #[test]
    fn tables_render() {
        let html = markdown_to_html("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn code_blocks_are_preserved() {
        let html = markdown_to_html("```\nlet x = 1;\n```");
        assert!(html.contains("<pre><code>"));
        assert!(html.contains("let x = 1;"));
    }

    #[test]
    fn links_render_with_href() {
        let html = markdown_to_html("[paper](https://arxiv.org/abs/1706.03762)");
        assert!(html.contains(r#"<a href="https://arxiv.org/abs/1706.03762">paper</a>"#));
    }
}
