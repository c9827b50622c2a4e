use std::collections::BTreeMap;

use async_graphql::{Context, InputObject, Json, Object, Result, SimpleObject};
use tracing::{error, info};

use crate::{
    chat::{ChatPayload, FilterKind, WebhookResponse, PREDEFINED_FILTERS},
    export::{self, FavoriteConversation},
    markdown::{self, Block},
    outbound::{LoginResponse, Outbound},
};

#[derive(Default)]
pub(super) struct ChatQuery;

#[derive(Default)]
pub(super) struct ChatMutation;

#[derive(SimpleObject)]
struct FilterOption {
    id: &'static str,
    label: &'static str,
    message: &'static str,
    kind: FilterKind,
    /// Label of the group the option is shown under.
    group: &'static str,
}

/// A field of the form shown next to a predefined filter.
#[derive(InputObject)]
struct FormField {
    key: String,
    value: String,
}

/// The assistant's answer, rendered.
#[derive(SimpleObject)]
struct ChatReply {
    caminho: Option<i64>,
    text: String,
    /// Whether the answer is a full report rather than a chat message.
    is_report: bool,
    blocks: Json<Vec<Block>>,
}

impl From<WebhookResponse> for ChatReply {
    fn from(answer: WebhookResponse) -> Self {
        let text = answer.reply_text().to_string();
        Self {
            caminho: answer.caminho,
            is_report: answer.is_report(),
            blocks: Json(markdown::render(&text)),
            text,
        }
    }
}

#[Object]
impl ChatQuery {
    async fn predefined_filters(&self) -> Vec<FilterOption> {
        PREDEFINED_FILTERS
            .iter()
            .map(|filter| FilterOption {
                id: filter.id,
                label: filter.label,
                message: filter.message,
                kind: filter.kind(),
                group: filter.kind().label(),
            })
            .collect()
    }

    async fn export_favorites_csv(&self, favorites: Vec<FavoriteConversation>) -> String {
        export::favorites_csv(&favorites)
    }
}

#[Object]
impl ChatMutation {
    /// Checks the credentials against the login webhook. On success the
    /// answer carries the user's chat webhook.
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> Result<LoginResponse> {
        let outbound = ctx.data::<Outbound>()?;
        let resp = outbound.login(email.trim(), &password).await;
        if resp.success {
            info!(email = email.trim(), "User logged in");
        }
        Ok(resp)
    }

    /// Sends a free text message to `webhook`.
    async fn chat(
        &self,
        ctx: &Context<'_>,
        webhook: String,
        user: String,
        message: String,
        #[graphql(default)] kind: FilterKind,
        data: Option<String>,
        tempo: Option<String>,
    ) -> Result<ChatReply> {
        if message.trim().is_empty() {
            return Err("message must not be empty".into());
        }
        let payload = ChatPayload::free_text(kind, &message, &user, data, tempo);
        send(ctx, &webhook, &payload).await
    }

    /// Requests the analysis of a predefined filter.
    async fn chat_with_filter(
        &self,
        ctx: &Context<'_>,
        webhook: String,
        user: String,
        option_id: String,
        #[graphql(default)] form_data: Vec<FormField>,
    ) -> Result<ChatReply> {
        let form_data: BTreeMap<String, String> = form_data
            .into_iter()
            .map(|field| (field.key, field.value))
            .collect();
        let payload = ChatPayload::predefined(&option_id, form_data, &user)?;
        send(ctx, &webhook, &payload).await
    }
}

async fn send(ctx: &Context<'_>, webhook: &str, payload: &ChatPayload) -> Result<ChatReply> {
    let outbound = ctx.data::<Outbound>()?;
    let answer = outbound.send_chat(webhook, payload).await.map_err(|e| {
        error!("Problem while sending chat message. {e:#}");
        format!("failed to send message: {e}")
    })?;
    Ok(answer.into())
}
