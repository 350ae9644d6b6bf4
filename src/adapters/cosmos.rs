use crate::adapters::signing::{cosmos_master_token, rfc1123_date};
use crate::adapters::{check_response, is_conflict};
use crate::domain::model::Reservation;
use crate::domain::ports::ReservationRepository;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;

const SERVICE: &str = "Cosmos DB";
const API_VERSION: &str = "2018-12-31";
const PAGE_SIZE: &str = "100";
const PARTITION_KEY_PATH: &str = "/id";

#[derive(Debug, Deserialize)]
struct DocumentFeed {
    #[serde(rename = "Documents", default)]
    documents: Vec<DocumentRef>,
}

#[derive(Debug, Deserialize)]
struct DocumentRef {
    id: String,
}

/// Document collection client. Collections are partitioned on `/id`.
#[derive(Debug, Clone)]
pub struct CosmosCollectionClient {
    client: Client,
    endpoint: String,
    key: String,
    database: String,
    collection: String,
}

impl CosmosCollectionClient {
    pub fn new(endpoint: &str, key: &str, database: &str, collection: &str) -> Self {
        Self::with_client(Client::new(), endpoint, key, database, collection)
    }

    pub fn with_client(
        client: Client,
        endpoint: &str,
        key: &str,
        database: &str,
        collection: &str,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key: key.to_string(),
            database: database.to_string(),
            collection: collection.to_string(),
        }
    }

    fn database_link(&self) -> String {
        format!("dbs/{}", self.database)
    }

    fn collection_link(&self) -> String {
        format!("dbs/{}/colls/{}", self.database, self.collection)
    }

    fn document_link(&self, id: &str) -> String {
        format!("{}/docs/{}", self.collection_link(), id)
    }

    /// Builds a signed request. `path` is appended to the account endpoint;
    /// `resource_link` is the resource the signature is scoped to.
    fn request(
        &self,
        method: Method,
        path: &str,
        resource_type: &str,
        resource_link: &str,
    ) -> Result<RequestBuilder> {
        let date = rfc1123_date(chrono::Utc::now());
        let token = cosmos_master_token(
            method.as_str(),
            resource_type,
            resource_link,
            &date,
            &self.key,
        )?;

        Ok(self
            .client
            .request(method, format!("{}/{}", self.endpoint, path))
            .header("authorization", token)
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION))
    }

    async fn create_if_missing(&self, request: RequestBuilder, what: &str) -> Result<()> {
        let response = request.send().await?;
        match check_response(SERVICE, response).await {
            Ok(_) => {
                tracing::info!("Created {}", what);
                Ok(())
            }
            Err(e) if is_conflict(&e) => {
                tracing::debug!("{} already exists", what);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn document_ids_page(
        &self,
        continuation: Option<&str>,
    ) -> Result<(Vec<String>, Option<String>)> {
        let link = self.collection_link();
        let mut request = self
            .request(Method::GET, &format!("{}/docs", link), "docs", &link)?
            .header("x-ms-max-item-count", PAGE_SIZE);
        if let Some(token) = continuation {
            request = request.header("x-ms-continuation", token);
        }

        let response = check_response(SERVICE, request.send().await?).await?;
        let next = response
            .headers()
            .get("x-ms-continuation")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let feed: DocumentFeed = response.json().await?;

        Ok((feed.documents.into_iter().map(|d| d.id).collect(), next))
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        let link = self.document_link(id);
        let response = self
            .request(Method::DELETE, &link, "docs", &link)?
            .header("x-ms-documentdb-partitionkey", partition_key_header(id)?)
            .send()
            .await?;
        check_response(SERVICE, response).await?;
        Ok(())
    }
}

fn partition_key_header(id: &str) -> Result<String> {
    Ok(serde_json::to_string(&[id])?)
}

#[async_trait]
impl ReservationRepository for CosmosCollectionClient {
    async fn ensure_collection(&self) -> Result<()> {
        let create_db = self
            .request(Method::POST, "dbs", "dbs", "")?
            .json(&serde_json::json!({ "id": self.database }));
        self.create_if_missing(create_db, &format!("database '{}'", self.database))
            .await?;

        let db_link = self.database_link();
        let create_coll = self
            .request(Method::POST, &format!("{}/colls", db_link), "colls", &db_link)?
            .json(&serde_json::json!({
                "id": self.collection,
                "partitionKey": { "paths": [PARTITION_KEY_PATH], "kind": "Hash" }
            }));
        self.create_if_missing(create_coll, &format!("collection '{}'", self.collection))
            .await
    }

    async fn delete_all(&self) -> Result<usize> {
        let mut ids = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let (page, next) = self.document_ids_page(continuation.as_deref()).await?;
            ids.extend(page);
            match next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        // Collect first; deleting while paging would shift the feed.
        for id in &ids {
            self.delete_document(id).await?;
        }

        tracing::debug!("Deleted {} documents from '{}'", ids.len(), self.collection);
        Ok(ids.len())
    }

    async fn save(&self, mut reservation: Reservation) -> Result<Reservation> {
        let id = reservation
            .id
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone();

        let link = self.collection_link();
        let response = self
            .request(Method::POST, &format!("{}/docs", link), "docs", &link)?
            .header("x-ms-documentdb-partitionkey", partition_key_header(&id)?)
            .header("x-ms-documentdb-is-upsert", "True")
            .json(&reservation)
            .send()
            .await?;

        let response = check_response(SERVICE, response).await?;
        Ok(response.json().await?)
    }
}
