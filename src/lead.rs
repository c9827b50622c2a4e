use std::borrow::Cow;

use anyhow::{bail, Context as _, Result};
use async_graphql::{Enum, SimpleObject};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::search::SearchColumn;

/// `filtro` text the analysis pipeline writes when a week repeats the data
/// of an earlier conversation.
const CARRY_OVER_MESSAGE: &str =
    "Os dados da semana se mantiveram os mesmos do atendimento realizado em";
const UNDEFINED: &str = "Indefinido";

/// Time granularity of an analysis.
#[derive(Enum, Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Period {
    #[default]
    Individual,
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    /// The `time_type` value stored in Directus.
    pub(crate) fn time_type(self) -> &'static str {
        match self {
            Self::Individual => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "month",
            Self::Yearly => "year",
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Individual => "Diário",
            Self::Weekly => "Semanal",
            Self::Monthly => "Mensal",
            Self::Yearly => "Anual",
        }
    }
}

#[derive(SimpleObject, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Apontamentos {
    pub(crate) clientes_insatisfeitos: String,
    pub(crate) clientes_satisfeitos: String,
    pub(crate) motivos_reclamacoes: String,
}

/// One analysed conversation. Empty strings stand for missing values.
#[derive(SimpleObject, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Lead {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) phone: String,
    /// Date of the analysis as received, usually `YYYY-MM-DD` or RFC 3339.
    pub(crate) dt_analysis: String,
    pub(crate) resumo: String,
    pub(crate) satisfacao: String,
    pub(crate) reclamacao: String,
    pub(crate) duracao: String,
    pub(crate) tema: String,
    pub(crate) busca: String,
    pub(crate) keywords: String,
    pub(crate) filtro: Option<String>,
    /// The record repeats an earlier conversation instead of carrying its
    /// own analysis.
    pub(crate) is_view_reference: bool,
    pub(crate) apontamentos: Apontamentos,
    pub(crate) session_id: Option<String>,
    pub(crate) time_type: Option<String>,
}

impl Lead {
    pub(crate) fn field(&self, column: SearchColumn) -> Cow<'_, str> {
        let value = match column {
            SearchColumn::Id => return Cow::Owned(self.id.to_string()),
            SearchColumn::DtAnalysis => &self.dt_analysis,
            SearchColumn::Name => &self.name,
            SearchColumn::Phone => &self.phone,
            SearchColumn::Resumo => &self.resumo,
            SearchColumn::Satisfacao => &self.satisfacao,
            SearchColumn::Reclamacao => &self.reclamacao,
            SearchColumn::Duracao => &self.duracao,
            SearchColumn::Tema => &self.tema,
            SearchColumn::Busca => &self.busca,
            SearchColumn::Keywords => &self.keywords,
        };
        Cow::Borrowed(value)
    }
}

/// A row of the Directus `data_analysis` collection.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DataAnalysisRecord {
    pub(crate) id: i64,
    pub(crate) user_id: Option<Value>,
    pub(crate) session_id: Option<String>,
    pub(crate) date_of_analysis: Option<String>,
    pub(crate) time_type: Option<String>,
    /// Either a JSON object or a string holding one.
    pub(crate) all_analyzes: Option<Value>,
    pub(crate) filtro: Option<String>,
}

impl TryFrom<DataAnalysisRecord> for Lead {
    type Error = anyhow::Error;

    fn try_from(record: DataAnalysisRecord) -> Result<Self> {
        let analysis = parse_analysis(record.id, record.all_analyzes.as_ref())?;
        let text = |key: &str| match analysis.get(key) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        let id = record
            .user_id
            .as_ref()
            .and_then(user_id)
            .unwrap_or(record.id);
        let phone = match text("Phone") {
            p if p == "null" => String::new(),
            p => p,
        };
        let dt_analysis = record
            .date_of_analysis
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| text("DT-Analysis"));
        let is_view_reference = record
            .filtro
            .as_deref()
            .is_some_and(|f| f.contains(CARRY_OVER_MESSAGE));

        let mut lead = Lead {
            id,
            name: text("Name"),
            phone,
            dt_analysis,
            resumo: text("Resumo"),
            satisfacao: text("Satisfacao"),
            reclamacao: text("Reclamacao"),
            duracao: text("Duracao"),
            tema: text("Tema"),
            busca: text("Busca"),
            keywords: text("Keywords"),
            filtro: record.filtro,
            is_view_reference,
            apontamentos: Apontamentos {
                clientes_insatisfeitos: text("Nome dos clientes insatisfeitos"),
                clientes_satisfeitos: text("Nome dos clientes satisfeitos"),
                motivos_reclamacoes: text("Todos os motivos de Reclamações"),
            },
            session_id: record.session_id,
            time_type: record.time_type,
        };
        if is_view_reference {
            lead.resumo = lead.filtro.clone().unwrap_or_default();
            for field in [
                &mut lead.satisfacao,
                &mut lead.reclamacao,
                &mut lead.duracao,
                &mut lead.tema,
                &mut lead.busca,
                &mut lead.keywords,
            ] {
                *field = UNDEFINED.to_string();
            }
        }
        Ok(lead)
    }
}

fn parse_analysis(id: i64, raw: Option<&Value>) -> Result<Map<String, Value>> {
    match raw {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Map::new()),
        Some(Value::String(s)) => serde_json::from_str(s)
            .with_context(|| format!("invalid all_analyzes JSON in record {id}")),
        Some(other) => bail!("unexpected all_analyzes value in record {id}: {other}"),
    }
}

fn user_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
