use crate::adapters::check_response;
use crate::adapters::signing::{sas_token, url_encode};
use crate::config::connection_string::ServiceBusConnection;
use crate::domain::model::BusMessage;
use crate::domain::ports::{SubscriptionReceiver, TopicPublisher};
use crate::utils::error::{Result, ShowcaseError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "Service Bus";
const TOKEN_TTL_SECS: i64 = 3600;
const BROKER_PROPERTIES: &str = "BrokerProperties";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BrokerProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lock_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delivery_count: Option<u32>,
}

/// Namespace-level client shared by topic and subscription clients.
#[derive(Debug, Clone)]
pub struct ServiceBusClient {
    client: Client,
    connection: ServiceBusConnection,
}

impl ServiceBusClient {
    pub fn new(connection: ServiceBusConnection) -> Self {
        Self::with_client(Client::new(), connection)
    }

    pub fn with_client(client: Client, connection: ServiceBusConnection) -> Self {
        Self { client, connection }
    }

    pub fn topic_client(&self, topic: &str) -> TopicClient {
        TopicClient {
            bus: self.clone(),
            topic: topic.to_string(),
        }
    }

    pub fn subscription_client(
        &self,
        topic: &str,
        subscription: &str,
        receive_timeout: Duration,
    ) -> SubscriptionClient {
        SubscriptionClient {
            bus: self.clone(),
            topic: topic.to_string(),
            subscription: subscription.to_string(),
            receive_timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.connection.endpoint, path)
    }

    /// A token scoped to the topic also covers its subscriptions.
    fn authorization(&self, topic: &str) -> Result<String> {
        let expiry = chrono::Utc::now().timestamp() + TOKEN_TTL_SECS;
        sas_token(
            &self.url(topic),
            &self.connection.key_name,
            &self.connection.key,
            expiry,
        )
    }
}

#[derive(Debug, Clone)]
pub struct TopicClient {
    bus: ServiceBusClient,
    topic: String,
}

#[async_trait]
impl TopicPublisher for TopicClient {
    async fn send(&self, message: BusMessage) -> Result<()> {
        let url = self.bus.url(&format!("{}/messages", self.topic));
        let properties = serde_json::to_string(&BrokerProperties {
            message_id: Some(message.message_id.clone()),
            ..Default::default()
        })?;

        tracing::debug!("Sending message {} to {}", message.message_id, url);
        let response = self
            .bus
            .client
            .post(&url)
            .header("Authorization", self.bus.authorization(&self.topic)?)
            .header("Content-Type", "text/plain; charset=utf-8")
            .header(BROKER_PROPERTIES, properties)
            .body(message.body)
            .send()
            .await?;

        check_response(SERVICE, response).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SubscriptionClient {
    bus: ServiceBusClient,
    topic: String,
    subscription: String,
    receive_timeout: Duration,
}

impl SubscriptionClient {
    fn messages_path(&self) -> String {
        format!(
            "{}/subscriptions/{}/messages",
            self.topic, self.subscription
        )
    }

    fn lock_url(&self, message: &BusMessage) -> Result<String> {
        let lock_token = message.lock_token.as_deref().ok_or_else(|| {
            ShowcaseError::ProcessingError {
                message: format!(
                    "Message {} was not received in peek-lock mode",
                    message.message_id
                ),
            }
        })?;
        Ok(self.bus.url(&format!(
            "{}/{}/{}",
            self.messages_path(),
            url_encode(&message.message_id),
            url_encode(lock_token)
        )))
    }
}

#[async_trait]
impl SubscriptionReceiver for SubscriptionClient {
    async fn receive(&self) -> Result<Option<BusMessage>> {
        let url = self.bus.url(&format!("{}/head", self.messages_path()));
        let timeout_secs = self.receive_timeout.as_secs().max(1);

        let response = self
            .bus
            .client
            .post(&url)
            .query(&[("timeout", timeout_secs.to_string())])
            .header("Authorization", self.bus.authorization(&self.topic)?)
            .body(Vec::<u8>::new())
            // The server holds the request open for up to `timeout` seconds.
            .timeout(self.receive_timeout + Duration::from_secs(10))
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let response = check_response(SERVICE, response).await?;

        let properties: BrokerProperties = match response.headers().get(BROKER_PROPERTIES) {
            Some(value) => serde_json::from_slice(value.as_bytes())?,
            None => BrokerProperties::default(),
        };
        let body = response.bytes().await?.to_vec();

        Ok(Some(BusMessage {
            message_id: properties.message_id.unwrap_or_default(),
            body,
            lock_token: properties.lock_token,
            sequence_number: properties.sequence_number,
            delivery_count: properties.delivery_count,
        }))
    }

    async fn complete(&self, message: &BusMessage) -> Result<()> {
        let response = self
            .bus
            .client
            .delete(self.lock_url(message)?)
            .header("Authorization", self.bus.authorization(&self.topic)?)
            .send()
            .await?;
        check_response(SERVICE, response).await?;
        Ok(())
    }

    async fn abandon(&self, message: &BusMessage) -> Result<()> {
        let response = self
            .bus
            .client
            .put(self.lock_url(message)?)
            .header("Authorization", self.bus.authorization(&self.topic)?)
            .body(Vec::<u8>::new())
            .send()
            .await?;
        check_response(SERVICE, response).await?;
        Ok(())
    }
}
