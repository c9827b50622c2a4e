use async_graphql::{Context, Object, Result, SimpleObject};
use tracing::error;

use crate::{
    export,
    lead::{Lead, Period},
    outbound::Outbound,
    search::{self, SearchColumn},
};

#[derive(Default)]
pub(super) struct LeadQuery;

/// Leads matching a search, with the size of the unfiltered set.
#[derive(SimpleObject)]
struct LeadPage {
    /// Number of records loaded for the period.
    total: usize,
    /// Number of records that matched.
    count: usize,
    leads: Vec<Lead>,
}

#[derive(SimpleObject)]
struct SearchColumnOption {
    column: SearchColumn,
    key: &'static str,
    label: &'static str,
}

#[derive(SimpleObject)]
struct PeriodOption {
    period: Period,
    time_type: &'static str,
    label: &'static str,
}

#[Object]
impl LeadQuery {
    /// Whether the Directus data API is reachable.
    async fn health(&self, ctx: &Context<'_>) -> Result<bool> {
        Ok(ctx.data::<Outbound>()?.health().await)
    }

    /// Loads the leads of `period` and keeps those whose `column` matches
    /// `query`. Searches by name by default.
    async fn leads(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] period: Period,
        column: Option<SearchColumn>,
        query: Option<String>,
    ) -> Result<LeadPage> {
        let all = load(ctx, period).await?;
        let leads = search::filter(
            &all,
            column.unwrap_or(SearchColumn::Name),
            query.as_deref().unwrap_or_default(),
        );
        Ok(LeadPage {
            total: all.len(),
            count: leads.len(),
            leads,
        })
    }

    async fn search_columns(&self) -> Vec<SearchColumnOption> {
        SearchColumn::ALL
            .into_iter()
            .map(|column| SearchColumnOption {
                column,
                key: column.key(),
                label: column.label(),
            })
            .collect()
    }

    async fn periods(&self) -> Vec<PeriodOption> {
        [
            Period::Individual,
            Period::Weekly,
            Period::Monthly,
            Period::Yearly,
        ]
        .into_iter()
        .map(|period| PeriodOption {
            period,
            time_type: period.time_type(),
            label: period.label(),
        })
        .collect()
    }

    /// The same search as `leads`, as CSV text.
    async fn export_leads_csv(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] period: Period,
        column: Option<SearchColumn>,
        query: Option<String>,
    ) -> Result<String> {
        let all = load(ctx, period).await?;
        let leads = search::filter(
            &all,
            column.unwrap_or(SearchColumn::Name),
            query.as_deref().unwrap_or_default(),
        );
        Ok(export::leads_csv(&leads))
    }
}

async fn load(ctx: &Context<'_>, period: Period) -> Result<Vec<Lead>> {
    let outbound = ctx.data::<Outbound>()?;
    outbound.data_analysis(period).await.map_err(|e| {
        error!("Problem while loading leads. {e:#}");
        format!("failed to load leads: {e}").into()
    })
}

#[cfg(test)]
mod tests {
    use crate::api::TestSchema;

    #[tokio::test]
    async fn leads_without_query() {
        let schema = TestSchema::new();
        let query = r"
        {
            leads {
                total
                count
                leads {
                    id
                    name
                }
            }
        }";
        let res = schema.execute(query).await;
        assert_eq!(
            res.data.to_string(),
            r#"{leads: {total: 2, count: 2, leads: [{id: 73, name: "João Silva"}, {id: 7, name: "Maria, \"Mari\" Souza"}]}}"#
        );
    }

    #[tokio::test]
    async fn leads_filtered() {
        let schema = TestSchema::new();
        let query = r#"
        {
            leads(period: INDIVIDUAL, column: DT_ANALYSIS, query: "/08") {
                total
                count
            }
        }"#;
        let res = schema.execute(query).await;
        assert_eq!(res.data.to_string(), "{leads: {total: 2, count: 2}}");

        let query = r#"
        {
            leads(query: "joao") {
                total
                leads {
                    id
                }
            }
        }"#;
        let res = schema.execute(query).await;
        assert_eq!(res.data.to_string(), "{leads: {total: 2, leads: [{id: 73}]}}");

        let query = r#"
        {
            leads(column: PHONE, query: "3333") {
                count
            }
        }"#;
        let res = schema.execute(query).await;
        assert_eq!(res.data.to_string(), "{leads: {count: 1}}");
    }

    #[tokio::test]
    async fn leads_for_empty_period() {
        let schema = TestSchema::new();
        let query = r"
        {
            leads(period: YEARLY) {
                total
                count
            }
        }";
        let res = schema.execute(query).await;
        assert_eq!(res.data.to_string(), "{leads: {total: 0, count: 0}}");
    }

    #[tokio::test]
    async fn leads_when_directus_is_down() {
        let schema = TestSchema::unreachable();
        let res = schema.execute("{ leads { total } }").await;
        assert_eq!(res.errors.len(), 1);
        assert!(res.errors[0].message.starts_with("failed to load leads"));

        let res = schema.execute("{ health }").await;
        assert_eq!(res.data.to_string(), "{health: false}");
    }

    #[tokio::test]
    async fn health() {
        let schema = TestSchema::new();
        let res = schema.execute("{ health }").await;
        assert_eq!(res.data.to_string(), "{health: true}");
    }

    #[tokio::test]
    async fn search_columns() {
        let schema = TestSchema::new();
        let query = r"
        {
            searchColumns {
                column
                key
                label
            }
        }";
        let res = schema.execute(query).await;
        let json = res.data.into_json().unwrap();
        let columns = json["searchColumns"].as_array().unwrap();
        assert_eq!(columns.len(), 11);
        assert_eq!(columns[0]["column"], "DT_ANALYSIS");
        assert_eq!(columns[0]["key"], "dtAnalysis");
        assert_eq!(columns[0]["label"], "Data Análise");
        assert_eq!(columns[6]["label"], "Reclamação");
    }

    #[tokio::test]
    async fn periods() {
        let schema = TestSchema::new();
        let res = schema.execute("{ periods { period timeType label } }").await;
        assert_eq!(
            res.data.to_string(),
            r#"{periods: [{period: INDIVIDUAL, timeType: "daily", label: "Diário"}, {period: WEEKLY, timeType: "weekly", label: "Semanal"}, {period: MONTHLY, timeType: "month", label: "Mensal"}, {period: YEARLY, timeType: "year", label: "Anual"}]}"#
        );
    }

    #[tokio::test]
    async fn export_leads_csv() {
        let schema = TestSchema::new();
        let res = schema
            .execute(r#"{ exportLeadsCsv(column: NAME, query: "maria") }"#)
            .await;
        let json = res.data.into_json().unwrap();
        let csv = json["exportLeadsCsv"].as_str().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            r#"05/08/2024,#007,"Maria, ""Mari"" Souza",21 3333-4444,,,,,,,"#
        );
    }
}
