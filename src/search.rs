use async_graphql::Enum;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::lead::Lead;

/// A lead column that can be searched.
#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum SearchColumn {
    DtAnalysis,
    Id,
    Name,
    Phone,
    Resumo,
    Satisfacao,
    Reclamacao,
    Duracao,
    Tema,
    Busca,
    Keywords,
}

impl SearchColumn {
    pub(crate) const ALL: [SearchColumn; 11] = [
        Self::DtAnalysis,
        Self::Id,
        Self::Name,
        Self::Phone,
        Self::Resumo,
        Self::Satisfacao,
        Self::Reclamacao,
        Self::Duracao,
        Self::Tema,
        Self::Busca,
        Self::Keywords,
    ];

    /// Field name as used by the dashboard client.
    pub(crate) fn key(self) -> &'static str {
        match self {
            Self::DtAnalysis => "dtAnalysis",
            Self::Id => "id",
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Resumo => "resumo",
            Self::Satisfacao => "satisfacao",
            Self::Reclamacao => "reclamacao",
            Self::Duracao => "duracao",
            Self::Tema => "tema",
            Self::Busca => "busca",
            Self::Keywords => "keywords",
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::DtAnalysis => "Data Análise",
            Self::Id => "ID",
            Self::Name => "Nome",
            Self::Phone => "Telefone",
            Self::Resumo => "Resumo",
            Self::Satisfacao => "Satisfação",
            Self::Reclamacao => "Reclamação",
            Self::Duracao => "Duração",
            Self::Tema => "Tema",
            Self::Busca => "Busca",
            Self::Keywords => "Keywords",
        }
    }
}

/// Returns the leads whose `column` matches `query`, in their original
/// order. A blank query matches everything.
pub(crate) fn filter(leads: &[Lead], column: SearchColumn, query: &str) -> Vec<Lead> {
    let query = query.trim();
    if query.is_empty() {
        return leads.to_vec();
    }
    let matcher = Matcher::new(column, query);
    leads
        .iter()
        .filter(|lead| matcher.matches(lead))
        .cloned()
        .collect()
}

struct Matcher<'q> {
    column: SearchColumn,
    query: &'q str,
    normalized: String,
    digits: String,
}

impl<'q> Matcher<'q> {
    fn new(column: SearchColumn, query: &'q str) -> Self {
        Self {
            column,
            query,
            normalized: normalize_text(query),
            digits: digits(query),
        }
    }

    fn matches(&self, lead: &Lead) -> bool {
        let value = lead.field(self.column);
        if value.trim().is_empty() {
            return false;
        }
        match self.column {
            SearchColumn::Id => value.starts_with(self.query),
            SearchColumn::DtAnalysis => {
                format_date(&value).is_some_and(|date| date_matches(&date, self.query))
            }
            // A query without digits has an empty digit form, which every
            // phone contains.
            SearchColumn::Phone => {
                digits(&value).contains(&self.digits)
                    || normalize_text(&value).contains(&self.normalized)
            }
            _ => normalize_text(&value).contains(&self.normalized),
        }
    }
}

/// Lower-cases `text` and strips diacritics, so `João` becomes `joao`.
pub(crate) fn normalize_text(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

fn digits(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Parses the analysis date. Timestamps keep the calendar date of their own
/// offset.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .into_iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|datetime| datetime.date())
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

/// Formats the analysis date as `DD/MM/YYYY`.
pub(crate) fn format_date(raw: &str) -> Option<String> {
    parse_date(raw).map(|date| date.format("%d/%m/%Y").to_string())
}

/// Matches a `DD/MM/YYYY` date against a partially typed query:
/// `/MM` selects a month, anything else containing `/` is a prefix of the
/// full date, and a bare number selects a day.
fn date_matches(formatted: &str, query: &str) -> bool {
    let mut parts = formatted.split('/');
    let (Some(day), Some(month)) = (parts.next(), parts.next()) else {
        return false;
    };

    if let Some(month_query) = query.strip_prefix('/') {
        match month_query.len() {
            0 => false,
            1 => month.starts_with(month_query),
            _ => month == format!("{month_query:0>2}"),
        }
    } else if query.contains('/') {
        formatted.starts_with(query)
    } else {
        match query.len() {
            1 => day.starts_with(query),
            2 => day == query,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(id: i64, name: &str, phone: &str, dt_analysis: &str) -> Lead {
        Lead {
            id,
            name: name.to_string(),
            phone: phone.to_string(),
            dt_analysis: dt_analysis.to_string(),
            ..Default::default()
        }
    }

    fn leads() -> Vec<Lead> {
        vec![
            lead(7, "João Silva", "+55 11 99999-9999", "2024-08-28"),
            lead(17, "Maria Souza", "(21) 3333-4444", "2024-12-02T13:45:00Z"),
            lead(70, "JOSÉ", "", "2023-08-05 09:00:00"),
            lead(73, "", "11 98888-7777", "invalid"),
            lead(120, "Ana Júlia", "null phone", ""),
        ]
    }

    fn ids(leads: &[Lead]) -> Vec<i64> {
        leads.iter().map(|lead| lead.id).collect()
    }

    #[test]
    fn blank_query_returns_everything() {
        let leads = leads();
        for column in SearchColumn::ALL {
            assert_eq!(filter(&leads, column, ""), leads);
            assert_eq!(filter(&leads, column, "   "), leads);
        }
    }

    #[test]
    fn id_prefix() {
        assert_eq!(ids(&filter(&leads(), SearchColumn::Id, "7")), vec![7, 70, 73]);
        assert_eq!(ids(&filter(&leads(), SearchColumn::Id, " 12 ")), vec![120]);
    }

    #[test]
    fn name_ignores_case_and_accents() {
        assert_eq!(ids(&filter(&leads(), SearchColumn::Name, "joao")), vec![7]);
        assert_eq!(ids(&filter(&leads(), SearchColumn::Name, "jo")), vec![7, 70]);
        assert_eq!(ids(&filter(&leads(), SearchColumn::Name, "JÚLIA")), vec![120]);
    }

    #[test]
    fn phone_digits() {
        assert_eq!(ids(&filter(&leads(), SearchColumn::Phone, "119999")), vec![7]);
        assert_eq!(ids(&filter(&leads(), SearchColumn::Phone, "(11)")), vec![7, 73]);
    }

    #[test]
    fn phone_query_without_digits_matches_every_phone() {
        assert_eq!(
            ids(&filter(&leads(), SearchColumn::Phone, "xyz")),
            vec![7, 17, 73, 120]
        );
        let single = [lead(1, "Ana", "+55 11 99999-9999", "2024-08-28")];
        assert_eq!(filter(&single, SearchColumn::Phone, "xyz").len(), 1);
        // Leads without a phone still never match.
        assert!(!ids(&filter(&leads(), SearchColumn::Phone, "null")).contains(&70));
    }

    #[test]
    fn date_by_month() {
        assert_eq!(ids(&filter(&leads(), SearchColumn::DtAnalysis, "/08")), vec![7, 70]);
        assert_eq!(ids(&filter(&leads(), SearchColumn::DtAnalysis, "/1")), vec![17]);
        assert_eq!(ids(&filter(&leads(), SearchColumn::DtAnalysis, "/0")), vec![7, 70]);
        assert!(filter(&leads(), SearchColumn::DtAnalysis, "/").is_empty());
        assert!(filter(&leads(), SearchColumn::DtAnalysis, "/8").is_empty());
    }

    #[test]
    fn date_by_day() {
        assert_eq!(ids(&filter(&leads(), SearchColumn::DtAnalysis, "2")), vec![7]);
        assert_eq!(ids(&filter(&leads(), SearchColumn::DtAnalysis, "02")), vec![17]);
        assert_eq!(ids(&filter(&leads(), SearchColumn::DtAnalysis, "0")), vec![17, 70]);
        assert!(filter(&leads(), SearchColumn::DtAnalysis, "028").is_empty());
    }

    #[test]
    fn date_by_prefix() {
        assert_eq!(ids(&filter(&leads(), SearchColumn::DtAnalysis, "28/08")), vec![7]);
        assert_eq!(ids(&filter(&leads(), SearchColumn::DtAnalysis, "05/08/2023")), vec![70]);
        assert!(filter(&leads(), SearchColumn::DtAnalysis, "28/08/2023").is_empty());
    }

    #[test]
    fn empty_fields_never_match() {
        assert!(filter(&leads(), SearchColumn::Tema, "a").is_empty());
        assert_eq!(ids(&filter(&leads(), SearchColumn::Name, "a")), vec![7, 17, 120]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let leads = leads();
        for (column, query) in [
            (SearchColumn::Name, "jo"),
            (SearchColumn::DtAnalysis, "/08"),
            (SearchColumn::Phone, "11"),
        ] {
            let once = filter(&leads, column, query);
            assert_eq!(filter(&once, column, query), once);
        }
    }

    #[test]
    fn date_formats() {
        assert_eq!(format_date("2024-08-28").as_deref(), Some("28/08/2024"));
        assert_eq!(
            format_date("2024-08-28T23:30:00-03:00").as_deref(),
            Some("28/08/2024")
        );
        assert_eq!(
            format_date("2024-08-28T10:00:00.000").as_deref(),
            Some("28/08/2024")
        );
        assert_eq!(format_date("28/08/2024"), None);
        assert_eq!(format_date(""), None);
    }

    #[test]
    fn column_names() {
        assert_eq!(SearchColumn::DtAnalysis.key(), "dtAnalysis");
        assert_eq!(SearchColumn::Keywords.key(), "keywords");
        assert_eq!(SearchColumn::Satisfacao.label(), "Satisfação");
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_text("  Reclamação ÀÉÎ "), "reclamacao aei");
    }
}
