//! PDF tool - writes a title and text lines into a PDF report

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use chrono::Utc;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use serde_json::{json, Value};
use crate::error::Error;
use crate::Result;
use super::{ParamKind, ParamSpec, Tool, ToolArgs};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 11.0;
const LINE_HEIGHT: f32 = 6.0;

/// Characters per body line at `BODY_SIZE` in Helvetica across the printable width
const LINE_CHARS: usize = 90;

/// Break `content` into lines of at most `max_chars`, keeping paragraph breaks.
/// Words longer than a line are split.
pub fn wrap_lines(content: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in content.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                lines.push(word.drain(..max_chars).collect());
            }
            let word: String = word.into_iter().collect();

            let needed = if line.is_empty() { word.chars().count() } else { line.chars().count() + 1 + word.chars().count() };
            if needed > max_chars {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        lines.push(line);
    }

    lines
}

/// Baseline of the first body line; the first page leaves room for the title
fn body_top(first_page: bool) -> f32 {
    if first_page {
        PAGE_HEIGHT - MARGIN - 2.0 * LINE_HEIGHT
    } else {
        PAGE_HEIGHT - MARGIN
    }
}

fn page_capacity(first_page: bool) -> usize {
    ((body_top(first_page) - MARGIN) / LINE_HEIGHT) as usize + 1
}

/// Split body lines into pages; there is always at least one page
pub fn paginate(lines: &[String]) -> Vec<&[String]> {
    let mut pages = Vec::new();
    let mut rest = lines;
    loop {
        let take = page_capacity(pages.is_empty()).min(rest.len());
        let (page, tail) = rest.split_at(take);
        pages.push(page);
        rest = tail;
        if rest.is_empty() {
            return pages;
        }
    }
}

/// Render the report; runs on a blocking thread
fn render(title: &str, pages: &[&[String]]) -> Result<Vec<u8>> {
    let pdf_err = |e: printpdf::Error| Error::Other(format!("PDF rendering failed: {}", e));

    let (doc, first_page, first_layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let title_font = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;
    let body_font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;

    for (i, lines) in pages.iter().enumerate() {
        let layer = if i == 0 {
            let layer = doc.get_page(first_page).get_layer(first_layer);
            layer.use_text(title, TITLE_SIZE, Mm(MARGIN), Mm(PAGE_HEIGHT - MARGIN), &title_font);
            layer
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            doc.get_page(page).get_layer(layer)
        };

        let mut y = body_top(i == 0);
        for line in lines.iter() {
            if !line.is_empty() {
                layer.use_text(line.as_str(), BODY_SIZE, Mm(MARGIN), Mm(y), &body_font);
            }
            y -= LINE_HEIGHT;
        }
    }

    doc.save_to_bytes().map_err(pdf_err)
}

/// File-name-safe form of a title
fn slug(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.split('-').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-");
    if slug.is_empty() { "report".to_string() } else { slug }
}

pub struct PdfTool {
    output_dir: PathBuf,
}

impl PdfTool {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    fn output_path(&self, title: &str) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S%.3f");
        self.output_dir.join(format!("{}-{}.pdf", slug(title), stamp))
    }
}

#[async_trait]
impl Tool for PdfTool {
    fn name(&self) -> &str { "generate_pdf" }
    fn description(&self) -> &str {
        "Write a titled text report to a PDF file and return its path"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("title", ParamKind::String, "Report title, printed on the first page"),
            ParamSpec::required("content", ParamKind::String, "Report body; line breaks start new lines"),
        ]
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let title = args.str("title")?.trim().to_string();
        if title.is_empty() {
            return Err(Error::Validation("generate_pdf: title must not be empty".to_string()));
        }
        let lines = wrap_lines(args.str("content")?, LINE_CHARS);
        let pages = paginate(&lines).len();

        let doc_title = title.clone();
        let bytes = tokio::task::spawn_blocking(move || render(&doc_title, &paginate(&lines)))
            .await
            .map_err(|e| Error::Other(format!("PDF task failed: {}", e)))??;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_path(&title);
        tokio::fs::write(&path, &bytes).await?;
        tracing::info!("Wrote {} page PDF to {:?}", pages, path);

        Ok(json!({
            "path": path.display().to_string(),
            "pages": pages,
        }))
    }
}
