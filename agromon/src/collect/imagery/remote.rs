use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{BandValues, ImageSet, ImageryService, ReduceRequest};
use crate::collect::http::{build_client, send_json, with_single_retry};
use crate::error::{CollectError, CollectResult};
use crate::settings::{Credentials, ImagerySettings};

const SERVICE: &str = "imagery";

/// Client for the remote geospatial imagery API.
///
/// Filters and reductions are described as JSON and evaluated server-side;
/// only the counts and the reduced scalars travel back. Every call carries a
/// request timeout and is retried once on a transient failure.
pub struct RemoteImagery {
    client: Client,
    base_url: Url,
    project: String,
    token: String,
    retry_delay: Duration,
}

#[derive(Deserialize)]
struct CountResponse {
    count: usize,
}

#[derive(Deserialize)]
struct ReduceResponse {
    #[serde(default)]
    values: BandValues,
}

impl RemoteImagery {
    pub fn new(
        base_url: &str,
        project: &str,
        token: &str,
        timeout: Duration,
        retry_delay: Duration,
    ) -> CollectResult<Self> {
        // A trailing slash keeps Url::join from dropping the last path segment
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| {
            CollectError::config(format!("invalid imagery base URL '{}': {}", base_url, e))
        })?;
        if project.trim().is_empty() {
            return Err(CollectError::config("imagery project id is empty"));
        }

        Ok(RemoteImagery {
            client: build_client(timeout)?,
            base_url,
            project: project.to_string(),
            token: token.to_string(),
            retry_delay,
        })
    }

    /// Build from resolved settings. Fails with a configuration error when no
    /// project or no access token is available.
    pub fn from_settings(settings: &ImagerySettings, credentials: &Credentials) -> CollectResult<Self> {
        let project = settings
            .project
            .as_deref()
            .or_else(|| credentials.project_id())
            .ok_or_else(|| {
                CollectError::config(
                    "no imagery project configured (set imagery.project, AGROMON_PROJECT, or use a service account with project_id)",
                )
            })?;
        let token = credentials.access_token.as_deref().ok_or_else(|| {
            CollectError::config("no imagery access token (set AGROMON_ACCESS_TOKEN)")
        })?;

        RemoteImagery::new(
            &settings.base_url,
            project,
            token,
            settings.timeout(),
            settings.retry_delay(),
        )
    }

    fn endpoint(&self, method: &str) -> CollectResult<Url> {
        self.base_url
            .join(&format!(
                "v1/projects/{}/collections:{}",
                urlencoding::encode(&self.project),
                method
            ))
            .map_err(|e| CollectError::config(format!("invalid imagery endpoint: {}", e)))
    }

    fn post<T: DeserializeOwned>(&self, method: &str, body: &Value) -> CollectResult<T> {
        let url = self.endpoint(method)?;
        debug!(url = %url, "Imagery request");
        with_single_retry(SERVICE, self.retry_delay, || {
            send_json(
                SERVICE,
                self.client
                    .post(url.clone())
                    .bearer_auth(&self.token)
                    .json(body),
            )
        })
    }
}

/// JSON description of a filtered image set
fn filter_body(images: &ImageSet) -> Value {
    json!({
        "collection": images.collection,
        "start": images.period.start().to_string(),
        "end": images.period.end().to_string(),
        "region": images.region.to_geojson(),
        "bands": images.bands,
    })
}

fn reduce_body(request: &ReduceRequest) -> Value {
    let mut body = filter_body(&request.images);
    body["band_math"] = json!(request.band_math);
    body["temporal_reducer"] = json!(request.temporal.name());
    body["spatial_reducer"] = json!("mean");
    body["scale"] = json!(request.scale.as_metres());
    body
}

impl ImageryService for RemoteImagery {
    #[instrument(skip_all, fields(collection = %images.collection))]
    fn count(&self, images: &ImageSet) -> CollectResult<usize> {
        let response: CountResponse = self.post("count", &filter_body(images))?;
        Ok(response.count)
    }

    #[instrument(skip_all, fields(collection = %request.images.collection, scale = request.scale.as_metres()))]
    fn reduce_region(&self, request: &ReduceRequest) -> CollectResult<BandValues> {
        let response: ReduceResponse = self.post("reduceRegion", &reduce_body(request))?;
        let mut values = response.values;
        for band in request.output_bands() {
            values.entry(band).or_insert(None);
        }
        Ok(values)
    }
}
