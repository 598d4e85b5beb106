use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};

use crate::{
    config::StorageConfig,
    error::{Error, Result},
    model::RunReport,
};

use super::StorageSink;

const API_VERSION: &str = "2021-08-06";

/// Uploads the report to an Azure Blob Storage container via the REST API.
///
/// The container is created on first use. Put Blob replaces the blob in a
/// single operation, so readers see either the previous or the new report.
#[derive(Debug, Clone)]
pub struct AzureBlobSink {
    endpoint: Url,
    container: String,
    blob_name: String,
    sas_token: Option<String>,
    bearer_token: Option<String>,
    http: Client,
}

impl AzureBlobSink {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let account = config
            .account_name
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| {
                Error::Configuration(
                    "Azure Storage account name is not configured.\n\
                     Hint: set STORAGE_ACCOUNT_NAME or run `warmtecheck configure`."
                        .into(),
                )
            })?;

        let raw_endpoint = match config.blob_endpoint.as_deref() {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{account}.blob.core.windows.net"),
        };
        let endpoint = Url::parse(&format!("{raw_endpoint}/")).map_err(|e| {
            Error::Configuration(format!("invalid blob endpoint '{raw_endpoint}': {e}"))
        })?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build blob HTTP client: {e}")))?;

        Ok(Self {
            endpoint,
            container: config.container_name.clone(),
            blob_name: config.output_name.clone(),
            sas_token: config.sas_token.clone().map(|t| t.trim_start_matches('?').to_string()),
            bearer_token: config.bearer_token.clone(),
            http,
        })
    }

    /// Endpoint plus `segments`, each percent-encoded as a single path
    /// segment, with the SAS token as the query.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::Configuration(format!("blob endpoint '{}' cannot hold a path", self.endpoint))
            })?
            .pop_if_empty()
            .extend(segments);
        if let Some(sas) = &self.sas_token {
            url.set_query(Some(sas));
        }
        Ok(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req.header("x-ms-version", API_VERSION);
        match &self.bearer_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Create the container; an existing container is fine.
    async fn ensure_container(&self) -> Result<()> {
        let url = self.url(&[self.container.as_str()])?;
        let res = self
            .authorize(self.http.put(url).query(&[("restype", "container")]))
            .body(Vec::<u8>::new())
            .send()
            .await
            .map_err(|e| {
                Error::SinkUnavailable(format!(
                    "Failed to reach blob endpoint {}: {e}",
                    self.endpoint
                ))
            })?;

        match res.status() {
            s if s.is_success() => {
                tracing::info!(container = %self.container, "created blob container");
                Ok(())
            }
            StatusCode::CONFLICT => Ok(()),
            _ => Err(Error::SinkUnavailable(
                describe_failure(&format!("Creating container '{}'", self.container), res).await,
            )),
        }
    }

    async fn put_blob(&self, body: String) -> Result<()> {
        let url = self.url(&[self.container.as_str(), self.blob_name.as_str()])?;
        let res = self
            .authorize(self.http.put(url))
            .header("x-ms-blob-type", "BlockBlob")
            .header("Content-Type", "application/json; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    Error::SinkUnavailable(format!(
                        "Failed to reach blob endpoint {}: {e}",
                        self.endpoint
                    ))
                } else {
                    Error::SinkWrite(format!("Upload of '{}' aborted: {e}", self.blob_name))
                }
            })?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }

        let msg = describe_failure(&format!("Uploading blob '{}'", self.blob_name), res).await;
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                Error::SinkUnavailable(msg)
            }
            _ => Error::SinkWrite(msg),
        })
    }
}

#[async_trait]
impl StorageSink for AzureBlobSink {
    async fn upload(&self, report: &RunReport) -> Result<()> {
        let body = serde_json::to_string(report)
            .map_err(|e| Error::SinkWrite(format!("Failed to serialize report: {e}")))?;

        self.ensure_container().await?;
        self.put_blob(body).await?;

        tracing::info!(
            container = %self.container,
            blob = %self.blob_name,
            "report uploaded to Azure Blob Storage"
        );
        Ok(())
    }
}

async fn describe_failure(action: &str, res: Response) -> String {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        format!("{action} failed with status {status}")
    } else {
        let body: String = body.chars().take(200).collect();
        format!("{action} failed with status {status}: {body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::StorageKind, model::LocationReport};
    use axum::{
        Router,
        body::Bytes,
        extract::{Path, RawQuery, State},
        http::HeaderMap,
        routing::put,
    };
    use chrono::Utc;
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    #[derive(Debug, Default)]
    struct Recorded {
        container_calls: Vec<Option<String>>,
        blobs: Vec<(String, String, String, Option<String>)>,
    }

    #[derive(Clone)]
    struct FakeAzure {
        container_status: StatusCode,
        blob_status: StatusCode,
        recorded: Arc<Mutex<Recorded>>,
    }

    async fn put_container(
        State(state): State<FakeAzure>,
        Path(_container): Path<String>,
        RawQuery(query): RawQuery,
    ) -> StatusCode {
        state.recorded.lock().unwrap().container_calls.push(query);
        state.container_status
    }

    async fn put_blob(
        State(state): State<FakeAzure>,
        Path((container, blob)): Path<(String, String)>,
        headers: HeaderMap,
        RawQuery(query): RawQuery,
        body: Bytes,
    ) -> StatusCode {
        let blob_type = headers
            .get("x-ms-blob-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert_eq!(blob_type, "BlockBlob");
        state.recorded.lock().unwrap().blobs.push((
            format!("{container}/{blob}"),
            String::from_utf8(body.to_vec()).unwrap(),
            blob_type,
            query,
        ));
        state.blob_status
    }

    async fn fake_azure(container_status: StatusCode, blob_status: StatusCode) -> (String, FakeAzure) {
        let state = FakeAzure {
            container_status,
            blob_status,
            recorded: Arc::new(Mutex::new(Recorded::default())),
        };
        let app = Router::new()
            .route("/devstoreaccount1/{container}", put(put_container))
            .route("/devstoreaccount1/{container}/{blob}", put(put_blob))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        (format!("http://{addr}/devstoreaccount1"), state)
    }

    fn config(endpoint: String) -> StorageConfig {
        StorageConfig {
            kind: StorageKind::AzureBlob,
            account_name: Some("devstoreaccount1".into()),
            blob_endpoint: Some(endpoint),
            container_name: "warmtecheck".into(),
            output_name: "latest.json".into(),
            ..Default::default()
        }
    }

    fn report() -> RunReport {
        RunReport {
            generated_at: Utc::now(),
            results: vec![LocationReport { place: "Utrecht".into(), forecast: vec![] }],
        }
    }

    #[test]
    fn default_endpoint_uses_account_name() {
        let cfg = StorageConfig {
            kind: StorageKind::AzureBlob,
            account_name: Some("mystorage".into()),
            sas_token: Some("?sv=1&sig=abc".into()),
            ..Default::default()
        };
        let sink = AzureBlobSink::new(&cfg).unwrap();
        let url = sink.url(&["warmtecheck", "latest.json"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://mystorage.blob.core.windows.net/warmtecheck/latest.json?sv=1&sig=abc"
        );
    }

    #[test]
    fn reserved_characters_stay_inside_the_blob_name() {
        let mut cfg = config("http://127.0.0.1:10000/devstoreaccount1".into());
        cfg.sas_token = Some("sv=1&sig=abc".into());
        let sink = AzureBlobSink::new(&cfg).unwrap();

        let url = sink.url(&["warmtecheck", "/daily?report#1.json"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:10000/devstoreaccount1/warmtecheck/%2Fdaily%3Freport%231.json?sv=1&sig=abc"
        );
        assert_eq!(url.query(), Some("sv=1&sig=abc"));
        assert_eq!(url.fragment(), None);
    }

    #[tokio::test]
    async fn creates_container_then_uploads_blob() {
        let (endpoint, fake) = fake_azure(StatusCode::CREATED, StatusCode::CREATED).await;
        let sink = AzureBlobSink::new(&config(endpoint)).unwrap();
        let report = report();

        sink.upload(&report).await.unwrap();

        let recorded = fake.recorded.lock().unwrap();
        assert_eq!(recorded.container_calls, vec![Some("restype=container".to_string())]);
        assert_eq!(recorded.blobs.len(), 1);
        let (path, body, _, _) = &recorded.blobs[0];
        assert_eq!(path, "warmtecheck/latest.json");
        let parsed: RunReport = serde_json::from_str(body).unwrap();
        assert_eq!(parsed, report);
    }

    #[tokio::test]
    async fn existing_container_is_not_an_error() {
        let (endpoint, fake) = fake_azure(StatusCode::CONFLICT, StatusCode::CREATED).await;
        let sink = AzureBlobSink::new(&config(endpoint)).unwrap();

        sink.upload(&report()).await.unwrap();
        assert_eq!(fake.recorded.lock().unwrap().blobs.len(), 1);
    }

    #[tokio::test]
    async fn sas_token_is_sent_on_every_request() {
        let (endpoint, fake) = fake_azure(StatusCode::CONFLICT, StatusCode::CREATED).await;
        let mut cfg = config(endpoint);
        cfg.sas_token = Some("sv=2021&sig=xyz".into());
        let sink = AzureBlobSink::new(&cfg).unwrap();

        sink.upload(&report()).await.unwrap();

        let recorded = fake.recorded.lock().unwrap();
        assert_eq!(
            recorded.container_calls,
            vec![Some("sv=2021&sig=xyz&restype=container".to_string())]
        );
        assert_eq!(recorded.blobs[0].3.as_deref(), Some("sv=2021&sig=xyz"));
    }

    #[tokio::test]
    async fn forbidden_container_is_unavailable_and_skips_upload() {
        let (endpoint, fake) = fake_azure(StatusCode::FORBIDDEN, StatusCode::CREATED).await;
        let sink = AzureBlobSink::new(&config(endpoint)).unwrap();

        let err = sink.upload(&report()).await.unwrap_err();
        assert!(matches!(err, Error::SinkUnavailable(_)), "{err}");
        assert!(fake.recorded.lock().unwrap().blobs.is_empty());
    }

    #[tokio::test]
    async fn blob_failures_are_classified() {
        let (endpoint, _) = fake_azure(StatusCode::CREATED, StatusCode::INTERNAL_SERVER_ERROR).await;
        let err = AzureBlobSink::new(&config(endpoint)).unwrap().upload(&report()).await.unwrap_err();
        assert!(matches!(err, Error::SinkWrite(_)), "{err}");

        let (endpoint, _) = fake_azure(StatusCode::CREATED, StatusCode::UNAUTHORIZED).await;
        let err = AzureBlobSink::new(&config(endpoint)).unwrap().upload(&report()).await.unwrap_err();
        assert!(matches!(err, Error::SinkUnavailable(_)), "{err}");
    }

    #[tokio::test]
    async fn odd_blob_name_is_uploaded_verbatim() {
        let (endpoint, fake) = fake_azure(StatusCode::CREATED, StatusCode::CREATED).await;
        let mut cfg = config(endpoint);
        cfg.output_name = "daily?report#1.json".into();

        AzureBlobSink::new(&cfg).unwrap().upload(&report()).await.unwrap();

        let recorded = fake.recorded.lock().unwrap();
        assert_eq!(recorded.blobs.len(), 1);
        assert_eq!(recorded.blobs[0].0, "warmtecheck/daily?report#1.json");
        assert_eq!(recorded.blobs[0].3, None);
    }

    #[tokio::test]
    async fn stalled_endpoint_times_out_as_unavailable() {
        let stall = || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::CREATED
        };
        let app = Router::new()
            .route("/devstoreaccount1/{container}", put(stall))
            .route("/devstoreaccount1/{container}/{blob}", put(stall));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let mut cfg = config(format!("http://{addr}/devstoreaccount1"));
        cfg.timeout_secs = 1;
        let started = std::time::Instant::now();
        let err = AzureBlobSink::new(&cfg).unwrap().upload(&report()).await.unwrap_err();

        assert!(matches!(err, Error::SinkUnavailable(_)), "{err}");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = AzureBlobSink::new(&config(format!("http://{addr}/devstoreaccount1"))).unwrap();
        let err = sink.upload(&report()).await.unwrap_err();
        assert!(matches!(err, Error::SinkUnavailable(_)), "{err}");
    }
}
