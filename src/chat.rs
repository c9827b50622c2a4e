use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use async_graphql::Enum;
use serde::Serialize;
use serde_json::Value;

const FALLBACK_REPLY: &str = "Processando sua solicitação.";
/// `caminho` value the assistant uses for full reports.
const REPORT_PATH: i64 = 2;

/// Audience of an analysis, sent to the webhook as `tipo_filtro`.
#[derive(Enum, Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum FilterKind {
    #[default]
    Geral,
    Cliente,
    Vendedor,
}

impl FilterKind {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Geral => "Geral",
            Self::Cliente => "Cliente",
            Self::Vendedor => "Vendedor",
        }
    }
}

/// A canned analysis request offered next to the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PredefinedFilter {
    pub(crate) id: &'static str,
    pub(crate) label: &'static str,
    pub(crate) message: &'static str,
}

impl PredefinedFilter {
    pub(crate) fn kind(&self) -> FilterKind {
        if self.id.contains("vendedor") {
            FilterKind::Vendedor
        } else {
            FilterKind::Cliente
        }
    }
}

pub(crate) const PREDEFINED_FILTERS: [PredefinedFilter; 6] = [
    PredefinedFilter {
        id: "vendedor_geral_semanal",
        label: "Semanal",
        message: "Gerar análise weekly geral de todos os vendedores",
    },
    PredefinedFilter {
        id: "vendedor_geral_mensal",
        label: "Mensal",
        message: "Gerar análise month geral de todos os vendedores",
    },
    PredefinedFilter {
        id: "vendedor_geral_anual",
        label: "Anual",
        message: "Gerar análise year geral de todos os vendedores",
    },
    PredefinedFilter {
        id: "cliente_geral_semanal",
        label: "Semanal",
        message: "Gerar análise weekly geral de todos os clientes",
    },
    PredefinedFilter {
        id: "cliente_geral_mensal",
        label: "Mensal",
        message: "Gerar análise month geral de todos os clientes",
    },
    PredefinedFilter {
        id: "cliente_geral_anual",
        label: "Anual",
        message: "Gerar análise year geral de todos os clientes",
    },
];

pub(crate) fn predefined_filter(id: &str) -> Option<&'static PredefinedFilter> {
    PREDEFINED_FILTERS.iter().find(|filter| filter.id == id)
}

/// Body posted to the user's chat webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ChatPayload {
    pub(crate) tipo_filtro: FilterKind,
    pub(crate) mensagem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tempo: Option<String>,
    pub(crate) user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) filtro_predefinido: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) dados_adicionais: Option<BTreeMap<String, String>>,
}

impl ChatPayload {
    pub(crate) fn free_text(
        kind: FilterKind,
        message: &str,
        user: &str,
        data: Option<String>,
        tempo: Option<String>,
    ) -> Self {
        Self {
            tipo_filtro: kind,
            mensagem: message.trim().to_string(),
            data: data.filter(|d| !d.trim().is_empty()),
            tempo: tempo.filter(|t| !t.trim().is_empty()),
            user: user.to_string(),
            filtro_predefinido: None,
            dados_adicionais: None,
        }
    }

    /// Builds the request for a predefined filter. Non-blank form values
    /// are appended to the message as `- key: value, ...`.
    pub(crate) fn predefined(
        filter_id: &str,
        form_data: BTreeMap<String, String>,
        user: &str,
    ) -> Result<Self> {
        let filter =
            predefined_filter(filter_id).ok_or_else(|| anyhow!("unknown filter: {filter_id}"))?;

        let mut mensagem = filter.message.to_string();
        let entries: Vec<String> = form_data
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(key, value)| format!("{key}: {}", value.trim()))
            .collect();
        if !entries.is_empty() {
            mensagem.push_str(" - ");
            mensagem.push_str(&entries.join(", "));
        }

        Ok(Self {
            tipo_filtro: filter.kind(),
            mensagem,
            data: None,
            tempo: None,
            user: user.to_string(),
            filtro_predefinido: Some(true),
            dados_adicionais: Some(form_data),
        })
    }
}

/// What the chat webhook answered.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct WebhookResponse {
    pub(crate) caminho: Option<i64>,
    pub(crate) resposta: Option<String>,
    pub(crate) message: Option<String>,
}

impl WebhookResponse {
    /// Reads the webhook body. Anything that is not an object is kept as
    /// the answer text, so `[{"output": ...}]` bodies reach the renderer.
    pub(crate) fn from_value(body: Value) -> Self {
        match body {
            Value::Object(mut map) => Self {
                caminho: map.get("caminho").and_then(Value::as_i64),
                resposta: map.remove("resposta").and_then(text),
                message: map.remove("message").and_then(text),
            },
            other => Self {
                resposta: text(other),
                ..Self::default()
            },
        }
    }

    pub(crate) fn reply_text(&self) -> &str {
        self.resposta
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or(FALLBACK_REPLY)
    }

    pub(crate) fn is_report(&self) -> bool {
        self.caminho == Some(REPORT_PATH)
    }
}

fn text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
