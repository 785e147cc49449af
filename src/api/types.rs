//! Response types for the Pairstream REST API.

use serde::Deserialize;

use crate::shared::types::PairRow;

/// Response from `GET /scanner`: one page of rows plus the unpaged total.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerApiResponse {
    pub pairs: Vec<PairRow>,
    #[serde(default)]
    pub total_rows: u64,
}
