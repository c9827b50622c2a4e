use async_graphql::{Json, Object, SimpleObject};
use chrono::Local;

use crate::{
    export,
    markdown::{self, Block},
};

#[derive(Default)]
pub(super) struct ReportQuery;

/// A report ready to be saved by the client.
#[derive(SimpleObject)]
struct ReportFile {
    title: String,
    generated: String,
    file_name: String,
    lines: Vec<String>,
    text: String,
}

#[Object]
impl ReportQuery {
    /// Renders an assistant answer into display blocks.
    async fn render_report(&self, content: String) -> Json<Vec<Block>> {
        Json(markdown::render(&content))
    }

    async fn is_markdown(&self, content: String) -> bool {
        markdown::is_markdown(&markdown::unwrap_response(&content))
    }

    /// Lays out a report for download, dated today. Returns null when the
    /// content is blank.
    async fn export_report(&self, content: String) -> Option<ReportFile> {
        let today = Local::now().date_naive();
        export::report_document(&markdown::unwrap_response(&content), today).map(|doc| {
            ReportFile {
                file_name: doc.file_name(),
                text: doc.text(),
                title: doc.title,
                generated: doc.generated,
                lines: doc.lines,
            }
        })
    }
}
