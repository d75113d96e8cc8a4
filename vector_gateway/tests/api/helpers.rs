use once_cell::sync::Lazy;
use uuid::Uuid;

use common::telemetry::{get_tracing_subscriber, init_tracing_subscriber};
use vector_gateway::{configuration::get_configuration, startup::Application};

// Ensures that the `tracing` stack is only initialized once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_tracing_subscriber(subscriber);
    } else {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_tracing_subscriber(subscriber);
    };
});

pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub fn invoke_endpoint(&self) -> String {
        format!("{}/invoke", self.address)
    }
}

/// Spawns the gateway on a random port against a fresh test collection
pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let configuration = {
        let mut configuration = get_configuration().expect("Failed to read configuration.");
        // A random OS port and a throwaway collection per test
        configuration.application.port = 0;
        configuration.qdrant.collection = format!("test_{}", Uuid::new_v4().simple());
        configuration.qdrant.collection_vector_size = 4;
        configuration
    };

    let application = Application::build(configuration, Some(1))
        .await
        .expect("Failed to build application.");
    let port = application.port();

    tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        api_client: reqwest::Client::new(),
    }
}

/// A distinct tenant per call, so tests never see each other's points
pub fn a_tenant_name() -> String {
    format!("tenant_{}", Uuid::new_v4().simple())
}
