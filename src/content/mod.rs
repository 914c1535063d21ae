//! Review content production: generation, composition, and rendering.

pub mod generator;
pub mod render;
pub mod title;

pub use generator::{AnthropicGenerator, GenerateError, GeneratedReview, ReviewGenerator};

use crate::queue::PaperMeta;

/// Compose the full post document: paper metadata header plus the generated
/// review body.
///
/// The header labels are Korean because the posts are; everything around
/// them is data from the queue item.
#[must_use]
pub fn compose_document(paper: &PaperMeta, review_markdown: &str) -> String {
    let mut doc = format!("# {}\n\n", paper.title);

    doc.push_str(&format!("**저자**: {}  \n", authors_display(&paper.authors)));
    if let Some(year) = paper.year {
        doc.push_str(&format!("**발행년도**: {year}년  \n"));
    }
    if let Some(citations) = paper.citations {
        doc.push_str(&format!("**인용수**: {citations}회  \n"));
    }
    if let Some(url) = &paper.url {
        doc.push_str(&format!("**논문 링크**: [{url}]({url})  \n"));
    }
    if let Some(arxiv_id) = &paper.arxiv_id {
        doc.push_str(&format!("**arXiv ID**: {arxiv_id}  \n"));
    }

    doc.push_str("\n---\n\n");
    doc.push_str(review_markdown);
    doc
}

/// At most three authors are listed; the rest are summarized.
fn authors_display(authors: &[String]) -> String {
    match authors.len() {
        0 => "N/A".to_owned(),
        1..=3 => authors.join(", "),
        n => format!("{} 외 {}명", authors[..3].join(", "), n - 3),
    }
}

/// Filesystem-safe backup filename for a paper's markdown artifact.
#[must_use]
pub fn backup_filename(paper: &PaperMeta) -> String {
    let safe: String = paper
        .title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .take(50)
        .collect();
    let year = paper
        .year
        .map_or_else(|| "unknown".to_owned(), |y| y.to_string());
    format!("{}_{year}.md", safe.trim())
}
