use std::{convert::Infallible, net::SocketAddr};

use async_graphql::http::GraphiQLSource;
use async_graphql_warp::{GraphQLBadRequest, GraphQLResponse};
use tracing::info;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use crate::api::Schema;

const ENDPOINT: &str = "/graphql";

/// `POST /graphql` runs a request, `GET /graphql` serves GraphiQL.
pub(crate) fn routes(
    schema: Schema,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let graphql = warp::path("graphql")
        .and(warp::path::end())
        .and(warp::post())
        .and(async_graphql_warp::graphql(schema))
        .and_then(
            |(schema, request): (Schema, async_graphql::Request)| async move {
                Ok::<_, Infallible>(GraphQLResponse::from(schema.execute(request).await))
            },
        );
    let graphiql = warp::path("graphql")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::html(GraphiQLSource::build().endpoint(ENDPOINT).finish()));

    graphiql.or(graphql).recover(recover)
}

async fn recover(err: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(GraphQLBadRequest(e)) = err.find() {
        return Ok(warp::reply::with_status(
            e.to_string(),
            StatusCode::BAD_REQUEST,
        ));
    }
    if err.is_not_found() {
        return Ok(warp::reply::with_status(
            "not found".to_string(),
            StatusCode::NOT_FOUND,
        ));
    }
    Ok(warp::reply::with_status(
        format!("{err:?}"),
        StatusCode::INTERNAL_SERVER_ERROR,
    ))
}

pub(crate) async fn serve(schema: Schema, addr: SocketAddr) {
    info!("Listening on http://{addr}{ENDPOINT}");
    warp::serve(routes(schema)).run(addr).await;
}
