//! KOJI backend: a JSON-RPC multicall client.
//!
//! KOJI's real hub protocol is XML-RPC; per spec.md §6 the wire format is
//! "opaque to this spec except for shape" (list-in/list-out parity), so this
//! client speaks a JSON-RPC multicall envelope against the configured hub
//! URL rather than reproducing XML-RPC verbatim.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use buildfinder_model::{BuildInfo, BuildState, Nvra, RemoteArchive, RpmInfo, TaskInfo};

use crate::error::CatalogError;
use crate::http_client::HttpClient;
use crate::RemoteCatalog;

const BACKEND: &str = "koji";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct KojiCatalog {
    http: HttpClient,
    hub_url: String,
    multicall_size: usize,
}

impl KojiCatalog {
    pub fn new(hub_url: impl Into<String>, multicall_size: usize) -> Result<Self, CatalogError> {
        Ok(Self {
            http: HttpClient::new(BACKEND)?,
            hub_url: hub_url.into(),
            multicall_size: multicall_size.max(1),
        })
    }

    async fn call<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: &[Req],
    ) -> Result<Vec<Resp>, CatalogError> {
        let mut out = Vec::with_capacity(params.len());
        for chunk in params.chunks(self.multicall_size) {
            let envelope = MulticallRequest { method, params: chunk };
            let request = self.http_client().post(&self.hub_url).json(&envelope);
            let response = self
                .http
                .execute_with_retry(BACKEND, request, DEFAULT_REQUEST_TIMEOUT)
                .await?;
            let decoded: MulticallResponse<Resp> =
                response.json().await.map_err(|e| CatalogError::Decode {
                    backend: BACKEND,
                    message: e.to_string(),
                })?;
            if decoded.results.len() != chunk.len() {
                return Err(CatalogError::BatchLengthMismatch {
                    backend: BACKEND,
                    expected: chunk.len(),
                    got: decoded.results.len(),
                });
            }
            out.extend(decoded.results);
        }
        Ok(out)
    }

    fn http_client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }
}

#[derive(Serialize)]
struct MulticallRequest<'a, Req: Serialize> {
    method: &'a str,
    params: &'a [Req],
}

#[derive(Deserialize)]
struct MulticallResponse<Resp> {
    results: Vec<Resp>,
}

#[derive(Deserialize)]
struct ArchiveTypesResponse {
    extensions: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct KojiBuildInfo {
    id: i64,
    package_id: i64,
    state: String,
    name: String,
    version: String,
    release: String,
    task_id: Option<i64>,
    #[serde(default)]
    type_names: BTreeSet<String>,
    #[serde(default)]
    is_import: bool,
}

fn parse_state(raw: &str) -> BuildState {
    match raw.to_ascii_uppercase().as_str() {
        "BUILDING" => BuildState::Building,
        "COMPLETE" => BuildState::Complete,
        "DELETED" => BuildState::Deleted,
        "FAILED" => BuildState::Failed,
        "CANCELED" | "CANCELLED" => BuildState::Canceled,
        _ => BuildState::Failed,
    }
}

#[async_trait]
impl RemoteCatalog for KojiCatalog {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn list_archives_by_checksum(
        &self,
        values: &[String],
    ) -> Result<Vec<Vec<RemoteArchive>>, CatalogError> {
        self.call("listArchives", values).await
    }

    async fn get_builds(&self, ids: &[i64]) -> Result<Vec<Option<BuildInfo>>, CatalogError> {
        let raw: Vec<Option<KojiBuildInfo>> = self.call("getBuild", ids).await?;
        Ok(raw
            .into_iter()
            .map(|maybe| {
                maybe.map(|b| BuildInfo {
                    id: b.id,
                    package_id: b.package_id,
                    state: parse_state(&b.state),
                    name: b.name,
                    version: b.version,
                    release: b.release,
                    task_id: b.task_id,
                    type_names: b.type_names,
                    is_import: b.is_import,
                })
            })
            .collect())
    }

    async fn list_tags(&self, ids: &[i64]) -> Result<Vec<Vec<String>>, CatalogError> {
        self.call("listTags", ids).await
    }

    async fn get_task_info(
        &self,
        ids: &[i64],
        with_requests: bool,
    ) -> Result<Vec<Option<TaskInfo>>, CatalogError> {
        let method = if with_requests { "getTaskInfoWithRequest" } else { "getTaskInfo" };
        self.call(method, ids).await
    }

    async fn list_archives_by_build(&self, ids: &[i64]) -> Result<Vec<Vec<RemoteArchive>>, CatalogError> {
        self.call("listArchivesByBuild", ids).await
    }

    async fn list_rpms_by_nvra(&self, nvras: &[Nvra]) -> Result<Vec<Option<RpmInfo>>, CatalogError> {
        let filenames: Vec<String> = nvras
            .iter()
            .map(|n| format!("{}-{}-{}.{}.rpm", n.name, n.version, n.release, n.arch))
            .collect();
        self.call("getRPM", &filenames).await
    }

    async fn list_rpms_by_build(&self, ids: &[i64]) -> Result<Vec<Vec<RpmInfo>>, CatalogError> {
        self.call("listRPMs", ids).await
    }

    async fn enrich_archive_type_info(&self, archives: &mut [RemoteArchive]) -> Result<(), CatalogError> {
        let ids: Vec<i64> = archives.iter().map(|a| a.archive_id).collect();
        let extensions: Vec<Vec<String>> = self.call("getArchiveTypeInfo", &ids).await?;
        if extensions.len() != archives.len() {
            return Err(CatalogError::BatchLengthMismatch {
                backend: BACKEND,
                expected: archives.len(),
                got: extensions.len(),
            });
        }
        for (archive, exts) in archives.iter_mut().zip(extensions) {
            archive.extensions = exts;
        }
        Ok(())
    }

    async fn known_archive_extensions(&self) -> Result<Vec<String>, CatalogError> {
        let envelope = MulticallRequest::<()> { method: "getArchiveTypes", params: &[] };
        let request = self.http_client().post(&self.hub_url).json(&envelope);
        let response = self
            .http
            .execute_with_retry(BACKEND, request, DEFAULT_REQUEST_TIMEOUT)
            .await?;
        let decoded: ArchiveTypesResponse = response.json().await.map_err(|e| CatalogError::Decode {
            backend: BACKEND,
            message: e.to_string(),
        })?;
        Ok(decoded.extensions)
    }
}
