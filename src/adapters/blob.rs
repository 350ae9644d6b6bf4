use crate::adapters::signing::{rfc1123_date, SharedKeyRequest};
use crate::adapters::{check_response, is_conflict};
use crate::config::connection_string::StorageConnection;
use crate::domain::model::UploadedBlob;
use crate::domain::ports::BlobStore;
use crate::utils::error::{Result, ShowcaseError};
use reqwest::Client;
use url::Url;

const SERVICE: &str = "Blob Storage";
const API_VERSION: &str = "2021-08-06";

/// Block blob client bound to one container.
#[derive(Debug, Clone)]
pub struct BlobContainerClient {
    client: Client,
    connection: StorageConnection,
    container: String,
}

impl BlobContainerClient {
    pub fn new(connection: StorageConnection, container: &str) -> Self {
        Self::with_client(Client::new(), connection, container)
    }

    pub fn with_client(client: Client, connection: StorageConnection, container: &str) -> Self {
        Self {
            client,
            connection,
            container: container.to_string(),
        }
    }

    pub fn container_url(&self) -> Result<Url> {
        let raw = format!("{}/{}", self.connection.blob_endpoint, self.container);
        Url::parse(&raw).map_err(|e| ShowcaseError::ConfigError {
            message: format!("Invalid blob endpoint '{}': {}", raw, e),
        })
    }

    pub fn blob_url(&self, name: &str) -> Result<Url> {
        let mut url = self.container_url()?;
        let shown = url.to_string();
        url.path_segments_mut()
            .map_err(|_| ShowcaseError::ConfigError {
                message: format!("Blob endpoint cannot be a base URL: {}", shown),
            })?
            .push(name);
        Ok(url)
    }

    async fn put(
        &self,
        url: Url,
        query: Vec<(&str, &str)>,
        body: Vec<u8>,
        content_type: &str,
        extra_headers: Vec<(&str, String)>,
    ) -> Result<reqwest::Response> {
        let mut ms_headers = vec![
            ("x-ms-date", rfc1123_date(chrono::Utc::now())),
            ("x-ms-version", API_VERSION.to_string()),
        ];
        ms_headers.extend(extra_headers);

        let signing = SharedKeyRequest {
            verb: "PUT",
            content_length: body.len(),
            content_type,
            ms_headers: ms_headers.clone(),
            path: url.path(),
            query: query.clone(),
        };
        let authorization =
            signing.authorization(&self.connection.account_name, &self.connection.account_key)?;

        let mut request = self
            .client
            .put(url.clone())
            .query(&query)
            .header("Authorization", authorization);
        if !content_type.is_empty() {
            request = request.header("Content-Type", content_type);
        }
        for (name, value) in ms_headers {
            request = request.header(name, value);
        }

        let response = request.body(body).send().await?;
        check_response(SERVICE, response).await
    }
}

impl BlobStore for BlobContainerClient {
    async fn ensure_container(&self) -> Result<()> {
        let url = self.container_url()?;
        match self
            .put(url, vec![("restype", "container")], Vec::new(), "", vec![])
            .await
        {
            Ok(_) => {
                tracing::info!("Created blob container '{}'", self.container);
                Ok(())
            }
            Err(e) if is_conflict(&e) => {
                tracing::debug!("Blob container '{}' already exists", self.container);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn upload(&self, name: &str, data: Vec<u8>, content_type: &str) -> Result<UploadedBlob> {
        let url = self.blob_url(name)?;
        let size = data.len();

        tracing::debug!("Uploading {} bytes to {}", size, url);
        self.put(
            url.clone(),
            vec![],
            data,
            content_type,
            vec![("x-ms-blob-type", "BlockBlob".to_string())],
        )
        .await?;

        Ok(UploadedBlob {
            container: self.container.clone(),
            name: name.to_string(),
            url: url.to_string(),
            size,
        })
    }
}
