use std::sync::Arc;

use qdrant_client::prelude::{QdrantClient, QdrantClientConfig};

use crate::{
    configuration::{ExecutionMode, QdrantSettings, Settings},
    ports::document_point_store::DocumentPointStore,
    repositories::{
        document_point_gateway_repository::{
            DocumentPointGatewayRepository, DocumentPointGatewayRepositoryError,
        },
        document_point_qdrant_repository::{
            DocumentPointQdrantRepository, DocumentPointQdrantRepositoryError,
        },
    },
};

/// Builds the document point store matching the configured execution mode
///
/// The mode is fixed here, once per process; per-call mode switching is not
/// supported. In `Direct` mode the Qdrant collection is created lazily if
/// it does not exist yet.
#[tracing::instrument(name = "Building the document point store")]
pub async fn build_document_point_store(
    settings: &Settings,
) -> Result<Arc<dyn DocumentPointStore>, ApplicationError> {
    match settings.execution_mode {
        ExecutionMode::Direct => {
            let client = get_qdrant_client(&settings.qdrant)?;
            let repository = DocumentPointQdrantRepository::try_new(client, &settings.qdrant).await?;

            Ok(Arc::new(repository))
        }
        ExecutionMode::Gateway => {
            let repository = DocumentPointGatewayRepository::try_new(&settings.gateway)?;

            Ok(Arc::new(repository))
        }
    }
}

/// Set up a client to Qdrant
pub fn get_qdrant_client(config: &QdrantSettings) -> Result<QdrantClient, ApplicationError> {
    let qdrant_config = QdrantClientConfig::from_url(&config.get_grpc_base_url());
    QdrantClient::new(Some(qdrant_config)).map_err(|e| ApplicationError::QdrantError(e.to_string()))
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationError {
    #[error("Error from Qdrant: {0}")]
    QdrantError(String),
    #[error(transparent)]
    DocumentPointQdrantRepositoryError(#[from] DocumentPointQdrantRepositoryError),
    #[error(transparent)]
    DocumentPointGatewayRepositoryError(#[from] DocumentPointGatewayRepositoryError),
}
