//! HTTP implementation of [`SyncGateway`](super::SyncGateway)

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{RemoteResult, SyncGateway};
use crate::config::GatewayConfig;
use crate::error::{Error, RemoteFailure, RemoteFailureKind, RemoteOperation, Result};
use crate::types::{
    CompanyId, Credential, ExportFormat, FileId, FileInfo, ModuleSummary, Region, SyncDateRecord,
};

/// Longest error body excerpt kept in a failure message
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest<'a> {
    file_id: &'a str,
    modules: &'a [String],
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompanyResponse {
    #[serde(default)]
    company_name: Option<String>,
}

#[derive(serde::Deserialize)]
struct ConnectResponse {
    url: String,
}

/// Gateway to the accounting service's REST API
///
/// Every request carries `Authorization: Bearer <token>`. Path parameters are
/// percent-encoded. Non-2xx answers, transport errors and unparseable bodies
/// all come back as [`RemoteFailure`].
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    base: String,
}

impl HttpGateway {
    /// Build a gateway from configuration
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the base URL does not parse, or
    /// [`Error::Other`] if the HTTP client cannot be created.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let origin = config.base_url.trim().trim_end_matches('/');
        url::Url::parse(origin).map_err(|e| Error::Config {
            message: format!("invalid base_url '{}': {}", origin, e),
            key: Some("gateway.base_url".to_string()),
        })?;

        let prefix = config.api_prefix.trim().trim_matches('/');
        let base = if prefix.is_empty() {
            origin.to_string()
        } else {
            format!("{}/{}", origin, prefix)
        };

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base })
    }

    /// Root every endpoint is resolved against (origin + API prefix)
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, route: &str, params: &[&str]) -> String {
        let mut url = format!("{}/{}", self.base, route);
        for param in params {
            url.push('/');
            url.push_str(&urlencoding::encode(param));
        }
        url
    }

    async fn send(
        &self,
        operation: RemoteOperation,
        module: Option<&str>,
        credential: &Credential,
        request: reqwest::RequestBuilder,
    ) -> RemoteResult<reqwest::Response> {
        let response = request
            .bearer_auth(credential.token())
            .send()
            .await
            .map_err(|e| tag(RemoteFailure::from_reqwest(operation, &e), module))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let failure = RemoteFailure::new(
                operation,
                RemoteFailureKind::Status {
                    code: status.as_u16(),
                },
                status_message(status, &body),
            );
            return Err(tag(failure, module));
        }

        Ok(response)
    }

    async fn read_json<T>(
        operation: RemoteOperation,
        module: Option<&str>,
        response: reqwest::Response,
    ) -> RemoteResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| tag(RemoteFailure::from_reqwest(operation, &e), module))?;

        // Treat an empty or `null` body as an empty record
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        serde_json::from_slice::<Option<T>>(&bytes)
            .map(Option::unwrap_or_default)
            .map_err(|e| {
                tag(
                    RemoteFailure::new(operation, RemoteFailureKind::Payload, e.to_string()),
                    module,
                )
            })
    }

    async fn get_json<T>(
        &self,
        operation: RemoteOperation,
        credential: &Credential,
        url: String,
    ) -> RemoteResult<T>
    where
        T: DeserializeOwned + Default,
    {
        tracing::debug!(operation = %operation, url = %url, "remote request");
        let response = self
            .send(operation, None, credential, self.client.get(&url))
            .await?;
        Self::read_json(operation, None, response).await
    }
}

fn tag(failure: RemoteFailure, module: Option<&str>) -> RemoteFailure {
    match module {
        Some(module) => failure.for_module(module),
        None => failure,
    }
}

/// "HTTP 404 Not Found: <detail>" from a status and error body
fn status_message(status: reqwest::StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect());

    if detail.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, detail)
    }
}

#[async_trait]
impl SyncGateway for HttpGateway {
    async fn trigger_sync(
        &self,
        credential: &Credential,
        file_id: &FileId,
        modules: &[String],
    ) -> RemoteResult<()> {
        let operation = RemoteOperation::TriggerSync;
        let module = (modules.len() == 1).then(|| modules[0].as_str());
        if modules.is_empty() {
            return Err(RemoteFailure::new(
                operation,
                RemoteFailureKind::Payload,
                "at least one module is required",
            ));
        }

        let url = self.endpoint("qbo/sync", &[]);
        tracing::debug!(operation = %operation, file_id = %file_id, modules = ?modules, "remote request");

        let body = SyncRequest {
            file_id: file_id.as_str(),
            modules,
        };
        self.send(operation, module, credential, self.client.post(&url).json(&body))
            .await?;
        Ok(())
    }

    async fn fetch_sync_dates(
        &self,
        credential: &Credential,
        file_id: &FileId,
    ) -> RemoteResult<SyncDateRecord> {
        let url = self.endpoint("qborawdata/sync-dates", &[file_id.as_str()]);
        self.get_json(RemoteOperation::FetchSyncDates, credential, url)
            .await
    }

    async fn fetch_summary(
        &self,
        credential: &Credential,
        company_id: &CompanyId,
    ) -> RemoteResult<ModuleSummary> {
        let url = self.endpoint("qborawdata/summary", &[company_id.as_str()]);
        self.get_json(RemoteOperation::FetchSummary, credential, url)
            .await
    }

    async fn delete_module_data(
        &self,
        credential: &Credential,
        company_id: &CompanyId,
        module: &str,
    ) -> RemoteResult<()> {
        let operation = RemoteOperation::DeleteModuleData;
        let url = self.endpoint("qborawdata/delete", &[company_id.as_str(), module]);
        tracing::debug!(operation = %operation, url = %url, "remote request");

        self.send(operation, Some(module), credential, self.client.delete(&url))
            .await?;
        Ok(())
    }

    async fn export_module_data(
        &self,
        credential: &Credential,
        file_id: &FileId,
        region: Region,
        module: &str,
        format: ExportFormat,
    ) -> RemoteResult<Vec<u8>> {
        let operation = RemoteOperation::ExportModuleData;
        let route = format!("qborawdata/{}", format.endpoint());
        let url = self.endpoint(&route, &[file_id.as_str(), region.code(), module]);
        tracing::debug!(operation = %operation, url = %url, "remote request");

        let response = self
            .send(operation, Some(module), credential, self.client.get(&url))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteFailure::from_reqwest(operation, &e).for_module(module))?;
        Ok(bytes.to_vec())
    }

    async fn fetch_file(&self, credential: &Credential, file_id: &FileId) -> RemoteResult<FileInfo> {
        let url = self.endpoint("files", &[file_id.as_str()]);
        self.get_json(RemoteOperation::FetchFile, credential, url)
            .await
    }

    async fn fetch_company_name(
        &self,
        credential: &Credential,
        file_id: &FileId,
    ) -> RemoteResult<String> {
        let operation = RemoteOperation::FetchCompanyName;
        let url = self.endpoint("qbocompany/company", &[file_id.as_str()]);
        tracing::debug!(operation = %operation, url = %url, "remote request");

        let response = self
            .send(operation, None, credential, self.client.get(&url))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteFailure::from_reqwest(operation, &e))?;
        let company: CompanyResponse = serde_json::from_slice(&bytes).map_err(|e| {
            RemoteFailure::new(operation, RemoteFailureKind::Payload, e.to_string())
        })?;
        Ok(company.company_name.unwrap_or_default())
    }

    async fn connect_url(&self, credential: &Credential, file_id: &FileId) -> RemoteResult<String> {
        let operation = RemoteOperation::Connect;
        let url = self.endpoint("qbo/connect", &[file_id.as_str()]);
        tracing::debug!(operation = %operation, url = %url, "remote request");

        let response = self
            .send(operation, None, credential, self.client.get(&url))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteFailure::from_reqwest(operation, &e))?;
        let connect: ConnectResponse = serde_json::from_slice(&bytes).map_err(|e| {
            RemoteFailure::new(operation, RemoteFailureKind::Payload, e.to_string())
        })?;
        Ok(connect.url)
    }

    async fn disconnect(&self, credential: &Credential, file_id: &FileId) -> RemoteResult<()> {
        let operation = RemoteOperation::Disconnect;
        let url = self.endpoint("qbo/disconnect", &[file_id.as_str()]);
        tracing::debug!(operation = %operation, url = %url, "remote request");

        self.send(operation, None, credential, self.client.post(&url))
            .await?;
        Ok(())
    }
}
