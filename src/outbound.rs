use anyhow::{Context, Result};
use async_graphql::SimpleObject;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use crate::{
    chat::{ChatPayload, WebhookResponse},
    lead::{DataAnalysisRecord, Lead, Period},
    settings::{Directus, Webhook},
};

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
const DATA_ANALYSIS_FIELDS: &str =
    "id,user_id,session_id,date_of_analysis,time_type,all_analyzes,filtro";

#[derive(Debug, Deserialize)]
struct DirectusItems<T> {
    data: Vec<T>,
}

/// Converts one Directus row. Rows of the wrong shape are an error.
fn lead_from_row(row: Value) -> Result<Lead> {
    let record: DataAnalysisRecord =
        serde_json::from_value(row).context("malformed analysis record")?;
    Lead::try_from(record)
}

/// Outcome of a login attempt. Failures of any kind come back as
/// `success: false`.
#[derive(SimpleObject, Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LoginResponse {
    pub(crate) success: bool,
    /// Chat webhook assigned to the user.
    pub(crate) webhook: Option<String>,
    pub(crate) message: Option<String>,
}

/// HTTP access to Directus and to the login and chat webhooks.
#[derive(Clone)]
pub(crate) struct Outbound {
    client: Client,
    directus: Directus,
    webhook: Webhook,
}

impl Outbound {
    pub(crate) fn new(directus: Directus, webhook: Webhook) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            directus,
            webhook,
        })
    }

    fn directus_url(&self, path: &str) -> String {
        format!("{}{path}", self.directus.api_url.trim_end_matches('/'))
    }

    /// Fetches the analysis records of `period`, newest first. Rows that are
    /// malformed or whose analysis cannot be read are skipped.
    #[instrument(skip(self))]
    pub(crate) async fn data_analysis(&self, period: Period) -> Result<Vec<Lead>> {
        let limit = self.directus.limit.to_string();
        let items: DirectusItems<Value> = self
            .client
            .get(self.directus_url("/items/data_analysis"))
            .bearer_auth(&self.directus.token)
            .query(&[
                ("limit", limit.as_str()),
                ("sort", "-id"),
                ("fields", DATA_ANALYSIS_FIELDS),
                ("filter[time_type][_contains]", period.time_type()),
            ])
            .send()
            .await
            .context("failed to reach Directus")?
            .error_for_status()
            .context("Directus rejected the request")?
            .json()
            .await
            .context("failed to decode Directus records")?;

        let leads: Vec<Lead> = items
            .data
            .into_iter()
            .filter_map(|row| {
                let id = row.get("id").cloned().unwrap_or(Value::Null);
                lead_from_row(row)
                    .map_err(|e| warn!(%id, "Skipping analysis record. {e:#}"))
                    .ok()
            })
            .collect();
        info!(count = leads.len(), "Loaded analysis records");
        Ok(leads)
    }

    /// Whether Directus answers its server info endpoint.
    pub(crate) async fn health(&self) -> bool {
        let response = self
            .client
            .get(self.directus_url("/server/info"))
            .bearer_auth(&self.directus.token)
            .send()
            .await;
        match response {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("Directus health check failed. {e}");
                false
            }
        }
    }

    #[instrument(skip(self, password))]
    pub(crate) async fn login(&self, email: &str, password: &str) -> LoginResponse {
        match self.try_login(email, password).await {
            Ok(resp) => resp,
            Err(e) => {
                error!("Problem while verifying login. {e:#}");
                LoginResponse::default()
            }
        }
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let body: Value = self
            .client
            .post(&self.webhook.login_url)
            .json(&json!({
                "email": email,
                "password": password,
                "action": "login",
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
        Ok(LoginResponse {
            success: body.get("success") == Some(&Value::Bool(true)),
            webhook: text("webhook"),
            message: text("message"),
        })
    }

    #[instrument(skip(self, payload), fields(user = %payload.user))]
    pub(crate) async fn send_chat(
        &self,
        webhook: &str,
        payload: &ChatPayload,
    ) -> Result<WebhookResponse> {
        let body: Value = self
            .client
            .post(webhook)
            .json(payload)
            .send()
            .await
            .context("failed to reach chat webhook")?
            .error_for_status()
            .context("chat webhook answered with an error")?
            .json()
            .await
            .context("chat webhook answer is not JSON")?;
        Ok(WebhookResponse::from_value(body))
    }
}

/// A local stand-in for Directus and the webhooks.
#[cfg(test)]
pub(crate) mod mock {
    use std::{collections::HashMap, net::SocketAddr};

    use serde_json::{json, Value};
    use warp::Filter;

    use super::Outbound;
    use crate::settings::{Directus, Webhook};

    pub(crate) const TOKEN: &str = "test-token";

    fn records(time_type: &str) -> Value {
        match time_type {
            "daily" => json!([
                {
                    "id": 3,
                    "user_id": 73,
                    "date_of_analysis": "2024-08-28",
                    "time_type": "daily",
                    "all_analyzes": "{\"Name\": \"João Silva\", \"Phone\": \"+55 11 99999-9999\", \"Tema\": \"Orçamento\"}"
                },
                {
                    "id": 2,
                    "date_of_analysis": "2024-07-02",
                    "time_type": "daily",
                    "all_analyzes": "{broken"
                },
                {
                    "id": 4,
                    "session_id": 991,
                    "date_of_analysis": "2024-08-01",
                    "time_type": "daily",
                    "all_analyzes": { "Name": "Sessão numérica" }
                },
                {
                    "id": 1,
                    "user_id": 7,
                    "date_of_analysis": "2024-08-05T12:00:00Z",
                    "time_type": "daily",
                    "all_analyzes": { "Name": "Maria, \"Mari\" Souza", "Phone": "21 3333-4444" }
                }
            ]),
            _ => json!([]),
        }
    }

    /// Starts the mock server and returns a client pointed at it.
    pub(crate) fn start() -> (Outbound, SocketAddr) {
        let items = warp::path!("items" / "data_analysis")
            .and(warp::get())
            .and(warp::header::<String>("authorization"))
            .and(warp::query::<HashMap<String, String>>())
            .map(|auth: String, query: HashMap<String, String>| {
                if auth != format!("Bearer {TOKEN}") {
                    return warp::reply::with_status(
                        warp::reply::json(&json!({"errors": []})),
                        warp::http::StatusCode::UNAUTHORIZED,
                    );
                }
                let time_type = query
                    .get("filter[time_type][_contains]")
                    .cloned()
                    .unwrap_or_default();
                warp::reply::with_status(
                    warp::reply::json(&json!({ "data": records(&time_type) })),
                    warp::http::StatusCode::OK,
                )
            });
        let info = warp::path!("server" / "info")
            .and(warp::get())
            .map(|| warp::reply::json(&json!({"data": {"project": "vision"}})));
        let login = warp::path!("login")
            .and(warp::post())
            .and(warp::body::json())
            .map(|body: Value| {
                if body["action"] == "login" && body["password"] == "secret" {
                    warp::reply::json(&json!({
                        "success": true,
                        "webhook": "http://hooks.local/chat/ana",
                    }))
                } else {
                    warp::reply::json(&json!({ "success": "yes", "message": "Credenciais inválidas" }))
                }
            });
        let chat = warp::path!("chat")
            .and(warp::post())
            .and(warp::body::json())
            .map(|body: Value| {
                let mensagem = body["mensagem"].as_str().unwrap_or_default();
                if mensagem.starts_with("Gerar análise") {
                    warp::reply::json(&json!({
                        "caminho": 2,
                        "resposta": "## Quantitativos\n- **Clientes**: 12\n## Relatorio\nSemana estável.",
                    }))
                } else {
                    warp::reply::json(&json!({
                        "caminho": 1,
                        "resposta": format!("Você disse ({}): {mensagem}", body["tipo_filtro"].as_str().unwrap_or_default()),
                    }))
                }
            });

        let routes = items.or(info).or(login).or(chat);
        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let outbound = Outbound::new(
            Directus {
                api_url: format!("http://{addr}/"),
                token: TOKEN.to_string(),
                limit: 100,
            },
            Webhook {
                login_url: format!("http://{addr}/login"),
            },
        )
        .unwrap();
        (outbound, addr)
    }

    /// A client whose endpoints refuse connections.
    pub(crate) fn unreachable() -> Outbound {
        Outbound::new(
            Directus {
                api_url: "http://127.0.0.1:9".to_string(),
                token: String::new(),
                limit: 100,
            },
            Webhook {
                login_url: "http://127.0.0.1:9/login".to_string(),
            },
        )
        .unwrap()
    }
}
