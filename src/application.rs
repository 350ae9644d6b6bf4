use crate::adapters::blob::BlobContainerClient;
use crate::adapters::cosmos::CosmosCollectionClient;
use crate::adapters::service_bus::ServiceBusClient;
use crate::adapters::sql::SqliteCustomerRepository;
use crate::api::{auth::OidcAuth, create_router, AppState};
use crate::config::AppConfig;
use crate::core::demos::{CosmosDbDemo, ObjectStorageDemo, ServiceBusDemo, SqlServerDemo};
use crate::core::runner::{DemoOutcome, DemoRunner};
use crate::utils::error::{Result, ShowcaseError};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// The HTTP server plus the demos that run once it is listening.
pub struct Application {
    config: AppConfig,
    runner: DemoRunner,
    state: Arc<AppState>,
}

impl Application {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let runner = build_runner(&config)?;
        let auth = config.auth.clone().map(OidcAuth::new).transpose()?;

        Ok(Self {
            config,
            runner,
            state: Arc::new(AppState::new(auth)),
        })
    }

    pub fn demo_names(&self) -> Vec<String> {
        self.runner.names()
    }

    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state))
    }

    pub fn address(&self) -> Result<SocketAddr> {
        let raw = format!("{}:{}", self.config.server.host, self.config.server.port);
        raw.parse().map_err(|e| ShowcaseError::InvalidConfigValueError {
            field: "server".to_string(),
            value: raw,
            reason: format!("Not a socket address: {}", e),
        })
    }

    /// Serves until `shutdown` resolves. Demos run once the listener is bound.
    pub async fn run<F>(self, run_demos: bool, shutdown: F) -> Result<Vec<DemoOutcome>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.address()?).await?;
        tracing::info!("🚀 Listening on http://{}", listener.local_addr()?);
        tracing::info!("   GET /greetings{}", if self.state.auth.is_some() { " (login required)" } else { "" });

        let app = self.router();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
        });

        let outcomes = if run_demos {
            let outcomes = self.runner.run_all().await;
            let failed = outcomes.iter().filter(|o| !o.succeeded).count();
            tracing::info!(
                "📊 Demos finished: {} succeeded, {} failed",
                outcomes.len() - failed,
                failed
            );
            outcomes
        } else {
            tracing::info!("⏭️  Skipping startup demos");
            Vec::new()
        };

        let served = server.await.map_err(|e| ShowcaseError::TaskError {
            message: format!("HTTP server task failed: {}", e),
        })?;

        tracing::info!("🛑 Shutting down");
        self.runner.shutdown_all().await;
        served?;

        Ok(outcomes)
    }
}

fn build_runner(config: &AppConfig) -> Result<DemoRunner> {
    let mut runner = DemoRunner::new();

    if let Some(sql) = &config.sql {
        let repository = SqliteCustomerRepository::open(&sql.database_path)?;
        runner.register(Arc::new(SqlServerDemo::new(repository, sql.limit())));
    }

    if let Some(bus) = &config.service_bus {
        let client = ServiceBusClient::new(bus.connection()?);
        let publisher = Arc::new(client.topic_client(&bus.topic));
        let receiver = Arc::new(client.subscription_client(
            &bus.topic,
            &bus.subscription,
            Duration::from_secs(bus.receive_timeout_secs()),
        ));
        runner.register(Arc::new(ServiceBusDemo::new(
            publisher,
            receiver,
            Duration::from_millis(bus.publish_delay_ms()),
        )));
    }

    if let Some(storage) = &config.storage {
        let store = BlobContainerClient::new(storage.connection()?, storage.container());
        runner.register(Arc::new(ObjectStorageDemo::new(
            store,
            storage.image_path(),
            storage.create_container(),
        )));
    }

    if let Some(cosmos) = &config.cosmos {
        let repository = CosmosCollectionClient::new(
            &cosmos.endpoint,
            &cosmos.key,
            &cosmos.database,
            cosmos.collection(),
        );
        runner.register(Arc::new(CosmosDbDemo::new(
            repository,
            cosmos.create_collection(),
        )));
    }

    Ok(runner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_demos_for_configured_sections() {
        let config = AppConfig::from_toml_str(
            r#"
[service_bus]
connection_string = "Endpoint=sb://demo-ns.servicebus.windows.net/;SharedAccessKeyName=Root;SharedAccessKey=c2VjcmV0"
topic = "messages"
subscription = "messages-subscription"

[cosmos]
endpoint = "https://demo.documents.azure.com"
key = "a2V5"
database = "bootiful"
"#,
        )
        .unwrap();

        let app = Application::from_config(config).unwrap();
        assert_eq!(app.demo_names(), vec!["service-bus", "cosmos-db"]);
        assert_eq!(app.address().unwrap().port(), 8080);
    }

    #[test]
    fn test_bad_host_is_config_error() {
        let mut config = AppConfig::default();
        config.server.host = "not a host".to_string();
        let app = Application::from_config(config).unwrap();
        assert!(matches!(
            app.address(),
            Err(ShowcaseError::InvalidConfigValueError { .. })
        ));
    }
}
