use serde::{Deserialize, Serialize};

use super::templates::rpc_response::RpcResponse;

/// Successful results of the vector gateway, one variant per action
///
/// The variants have disjoint field names so the enum can stay untagged
/// and the wire shape mirrors the direct adapter's return values.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum VectorGatewayResponseData {
    Upserted { upserted: u64 },
    Found {
        contexts: Vec<String>,
        sources: Vec<String>,
    },
    Purged { deleted: u64 },
}

pub type VectorGatewayResponseDto = RpcResponse<VectorGatewayResponseData>;
