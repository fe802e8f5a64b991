//! Fetch a REST endpoint and normalise the response into a [Table].

use crate::error::WellboreError;
use crate::session::Session;
use crate::table::Table;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

/// Outcome of fetching an endpoint
#[derive(Clone, Debug, PartialEq)]
pub enum Extracted {
    /// A 200 response that could be read as records
    Table(Table),
    /// A 200 response whose body is not JSON or not shaped like records
    Malformed,
    NotFound,
    /// Any other status
    Unavailable { status: StatusCode, reason: String },
}

impl Extracted {
    /// The extracted table, or an empty one.
    pub fn into_table(self) -> Table {
        match self {
            Self::Table(table) => table,
            _ => Table::new(),
        }
    }
}

/// Fetch an endpoint, distinguishing the ways it can fail to produce data.
///
/// Transport errors are returned as errors.
#[tracing::instrument(level = "DEBUG", skip(session))]
pub async fn fetch(session: &Session, endpoint: &Url) -> Result<Extracted, WellboreError> {
    let response = session.get(endpoint).await?;
    match response.status() {
        StatusCode::OK => {
            let body = response.bytes().await?;
            let table = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|value| Table::from_response_body(&value));
            Ok(table.map_or(Extracted::Malformed, Extracted::Table))
        }
        StatusCode::NOT_FOUND => Ok(Extracted::NotFound),
        status => Ok(Extracted::Unavailable {
            status,
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        }),
    }
}

/// Fetch an endpoint as a table.
///
/// Never fails: a missing resource, an error status, a malformed body or a transport error are
/// logged and yield an empty table.
pub async fn extract(session: &Session, endpoint: &Url) -> Table {
    match fetch(session, endpoint).await {
        Ok(Extracted::Table(table)) => table,
        Ok(Extracted::Malformed) => {
            warn!("No valid data extracted from endpoint {}", endpoint);
            Table::new()
        }
        Ok(Extracted::NotFound) => {
            info!("{} either does not exist or can not be found", endpoint);
            Table::new()
        }
        Ok(Extracted::Unavailable { status, reason }) => {
            warn!(
                "Can not fetch data from endpoint {} ({}: {})",
                endpoint,
                status.as_u16(),
                reason
            );
            Table::new()
        }
        Err(err) => {
            warn!("Can not fetch data from endpoint {}: {}", endpoint, err);
            Table::new()
        }
    }
}
