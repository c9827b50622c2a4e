mod chat;
mod lead;
mod report;

use async_graphql::{EmptySubscription, MergedObject};

use crate::outbound::Outbound;

/// A set of queries defined in the schema.
///
/// This is exposed only for [`Schema`], and not used directly.
#[derive(Default, MergedObject)]
pub(crate) struct Query(lead::LeadQuery, report::ReportQuery, chat::ChatQuery);

/// A set of mutations defined in the schema.
#[derive(Default, MergedObject)]
pub(crate) struct Mutation(chat::ChatMutation);

pub(crate) type Schema = async_graphql::Schema<Query, Mutation, EmptySubscription>;

pub(crate) fn schema(outbound: Outbound) -> Schema {
    Schema::build(Query::default(), Mutation::default(), EmptySubscription)
        .data(outbound)
        .finish()
}

#[cfg(test)]
struct TestSchema {
    addr: std::net::SocketAddr,
    schema: Schema,
}

#[cfg(test)]
impl TestSchema {
    /// Builds a schema backed by the mock Directus and webhook server. Must
    /// be called from within a Tokio runtime.
    fn new() -> Self {
        let (outbound, addr) = crate::outbound::mock::start();
        Self {
            addr,
            schema: schema(outbound),
        }
    }

    fn unreachable() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 9).into(),
            schema: schema(crate::outbound::mock::unreachable()),
        }
    }

    fn webhook(&self) -> String {
        format!("http://{}/chat", self.addr)
    }

    async fn execute(&self, query: &str) -> async_graphql::Response {
        let request: async_graphql::Request = query.into();
        self.schema.execute(request).await
    }
}
