//! Downloadable renditions of leads, favorite conversations and reports.

use std::borrow::Cow;

use async_graphql::InputObject;
use chrono::NaiveDate;

use crate::{lead::Lead, search::format_date};

const LEADS_HEADER: &str =
    "Data,ID,Nome,Telefone,Resumo,Satisfação,Reclamação,Duração,Tema,Busca,Keywords";
const FAVORITES_HEADER: &str = "Data,Mensagens,Prévia";
const REPORT_TITLE: &str = "Relatório Vision";
const REPORT_WIDTH: usize = 90;

/// A saved conversation as listed on the favorites page.
#[derive(InputObject, Debug, Clone, PartialEq, Eq)]
pub(crate) struct FavoriteConversation {
    /// Already formatted for display.
    pub(crate) date: String,
    pub(crate) message_count: u32,
    pub(crate) preview: String,
}

pub(crate) fn leads_csv(leads: &[Lead]) -> String {
    let mut out = String::from(LEADS_HEADER);
    for lead in leads {
        let date = format_date(&lead.dt_analysis).unwrap_or_else(|| lead.dt_analysis.clone());
        let id = format!("#{:03}", lead.id);
        let row: [&str; 11] = [
            &date,
            &id,
            &lead.name,
            &lead.phone,
            &lead.resumo,
            &lead.satisfacao,
            &lead.reclamacao,
            &lead.duracao,
            &lead.tema,
            &lead.busca,
            &lead.keywords,
        ];
        out.push('\n');
        out.push_str(&row.map(escape).join(","));
    }
    out
}

pub(crate) fn favorites_csv(favorites: &[FavoriteConversation]) -> String {
    if favorites.is_empty() {
        return String::new();
    }
    let mut out = String::from(FAVORITES_HEADER);
    for favorite in favorites {
        out.push('\n');
        out.push_str(&format!(
            "{},{},{}",
            escape(&favorite.date),
            favorite.message_count,
            quote(&favorite.preview)
        ));
    }
    out
}

fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(quote(field))
    } else {
        Cow::Borrowed(field)
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// A report laid out as plain text pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReportDocument {
    pub(crate) title: String,
    pub(crate) generated: String,
    pub(crate) lines: Vec<String>,
    pub(crate) date: NaiveDate,
}

impl ReportDocument {
    pub(crate) fn file_name(&self) -> String {
        format!("relatorio-vision-{}.txt", self.date.format("%Y-%m-%d"))
    }

    pub(crate) fn text(&self) -> String {
        let mut out = format!("{}\n{}\n\n", self.title, self.generated);
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Lays out `content` for download. Returns `None` when there is nothing to
/// report.
pub(crate) fn report_document(content: &str, today: NaiveDate) -> Option<ReportDocument> {
    if content.trim().is_empty() {
        return None;
    }
    let lines = content
        .trim_end()
        .lines()
        .flat_map(|line| wrap(line, REPORT_WIDTH))
        .collect();
    Some(ReportDocument {
        title: REPORT_TITLE.to_string(),
        generated: format!("Gerado em: {}", today.format("%d/%m/%Y")),
        lines,
        date: today,
    })
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
fn wrap(line: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut len = 0;
    for word in line.split_whitespace() {
        let word_len = word.chars().count();
        if len > 0 && len + 1 + word_len > width {
            lines.push(std::mem::take(&mut current));
            len = 0;
        }
        if len > 0 {
            current.push(' ');
            len += 1;
        }
        current.push_str(word);
        len += word_len;
    }
    lines.push(current);
    lines
}
