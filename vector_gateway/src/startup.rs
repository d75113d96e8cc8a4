use std::net::TcpListener;

use actix_web::{
    dev::Server,
    web::{self, Data},
    App, HttpServer,
};
use tracing::info;
use tracing_actix_web::TracingLogger;

use retrieval_service::{
    repositories::document_point_qdrant_repository::{
        DocumentPointQdrantRepository, DocumentPointQdrantRepositoryError,
    },
    startup::{get_qdrant_client, ApplicationError},
};

use crate::{
    configuration::Settings,
    routes::{health_check, invoke},
};

/// Holds the newly built server, and some useful properties
pub struct Application {
    server: Server,
    port: u16,
}

impl Application {
    /// # Parameters
    /// - nb_workers: number of actix-web workers
    ///   if `None`, the number of available physical CPUs is used as the worker count.
    #[tracing::instrument(name = "Building the vector gateway application")]
    pub async fn build(
        settings: Settings,
        nb_workers: Option<usize>,
    ) -> Result<Self, ApplicationBuildError> {
        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let qdrant_client = get_qdrant_client(&settings.qdrant)?;
        let repository = DocumentPointQdrantRepository::try_new(qdrant_client, &settings.qdrant)
            .await?;

        let server = run(listener, repository, nb_workers)?;

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// This function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        info!("Running the vector gateway ...");
        self.server.await
    }
}

/// listener: the consumer binds their own port
///
/// TracingLogger middleware: helps collecting telemetry data.
/// It generates a unique identifier for each incoming request: `request_id`.
pub fn run(
    listener: TcpListener,
    repository: DocumentPointQdrantRepository,
    nb_workers: Option<usize>,
) -> Result<Server, std::io::Error> {
    // Shared among all workers: the repository only holds a thread-safe
    // Qdrant channel and its collection parameters.
    let repository = Data::new(repository);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/invoke", web::post().to(invoke))
            .app_data(repository.clone())
    })
    .listen(listener)?;

    // If no workers were set, use the actix-web default (number of physical CPUs)
    if let Some(nb_workers) = nb_workers {
        return Ok(server.workers(nb_workers).run());
    }

    Ok(server.run())
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationBuildError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    QdrantClientError(#[from] ApplicationError),
    #[error(transparent)]
    DocumentPointQdrantRepositoryError(#[from] DocumentPointQdrantRepositoryError),
}
