//! Analytics API HTTP client.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use atfm_core::models::{
    FlowExtraction, FlowQuery, Hotspot, OccupancySnapshot, RankedArrivals, RankingQuery,
    SimulationRequest, SimulationResult, SlackDistribution, SlackSign,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Time-window label -> flight ids entering the traffic volume in it.
pub type TvFlights = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HotspotsResponse {
    #[serde(default)]
    pub hotspots: Vec<Hotspot>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// HTTP client for the analytics backend.
#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) auth_token: Option<String>,
    pub(crate) request_id: Option<String>,
}

impl AnalyticsClient {
    /// Create a client. An empty token means requests are sent without
    /// an `Authorization` header.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        let mut this = Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
            request_id: None,
        };
        this.set_auth_token(Some(token.into()));
        Ok(this)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_auth_token(&mut self, token: Option<String>) {
        self.auth_token = token
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
    }

    pub fn set_request_id(&mut self, request_id: Option<String>) {
        self.request_id = request_id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
    }

    fn decorate(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = self.auth_token.as_deref() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        match self.request_id.as_deref() {
            Some(value) => request.header("X-Request-ID", value),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let response = self
            .decorate(self.client.get(&url).query(query))
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", what))?;

        Self::read_json(response, what).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .decorate(
                self.client
                    .post(&url)
                    .header("Content-Type", "application/json")
                    .json(body),
            )
            .send()
            .await
            .with_context(|| format!("Failed to send {}", what))?;

        Self::read_json(response, what).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("{} request failed: {} {}", what, status, body);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse {} response", what))
    }

    /// Occupancy counts and hourly capacity for a traffic volume.
    pub async fn occupancy(&self, traffic_volume_id: &str) -> Result<OccupancySnapshot> {
        let mut snapshot: OccupancySnapshot = self
            .get_json(
                "/tv_count_with_capacity",
                &[("traffic_volume_id", traffic_volume_id.to_string())],
                "occupancy",
            )
            .await?;
        if snapshot.traffic_volume_id.is_empty() {
            snapshot.traffic_volume_id = traffic_volume_id.to_string();
        }
        Ok(snapshot)
    }

    /// Flight ids per time window for a traffic volume.
    pub async fn tv_flights(&self, traffic_volume_id: &str) -> Result<TvFlights> {
        self.get_json(
            "/tv_flights",
            &[("traffic_volume_id", traffic_volume_id.to_string())],
            "traffic volume flights",
        )
        .await
    }

    /// Hotspots above `threshold`, sorted by `z_max` descending.
    pub async fn hotspots(&self, threshold: f64) -> Result<HotspotsResponse> {
        let mut response: HotspotsResponse = self
            .get_json("/hotspots", &[("threshold", threshold.to_string())], "hotspots")
            .await?;
        response.hotspots.sort_by(|a, b| b.z_max.total_cmp(&a.z_max));
        if response.count == 0 {
            response.count = response.hotspots.len();
        }
        Ok(response)
    }

    /// Ordered arrivals at a traffic volume around a reference time.
    pub async fn ranked_arrivals(&self, query: &RankingQuery) -> Result<RankedArrivals> {
        // The backend requires seed_flight_ids even when empty.
        let mut params = vec![
            ("traffic_volume_id", query.traffic_volume_id.clone()),
            ("ref_time_str", query.ref_time_str.clone()),
            ("seed_flight_ids", query.seed_flight_ids.join(",")),
        ];
        if let Some(duration) = query.duration_min {
            params.push(("duration_min", duration.to_string()));
        }
        if let Some(top_k) = query.top_k {
            params.push(("top_k", top_k.to_string()));
        }
        self.get_json(
            "/regulation_ranking_tv_flights_ordered",
            &params,
            "ranked arrivals",
        )
        .await
    }

    pub async fn slack_distribution(
        &self,
        traffic_volume_id: &str,
        ref_time_str: &str,
        sign: SlackSign,
        delta_min: Option<f64>,
    ) -> Result<SlackDistribution> {
        let mut params = vec![
            ("traffic_volume_id", traffic_volume_id.to_string()),
            ("ref_time_str", ref_time_str.to_string()),
            ("sign", sign.as_str().to_string()),
        ];
        if let Some(delta) = delta_min.filter(|d| d.is_finite()) {
            params.push(("delta_min", delta.to_string()));
        }
        self.get_json("/slack_distribution", &params, "slack distribution")
            .await
    }

    pub async fn flow_extraction(&self, query: &FlowQuery) -> Result<FlowExtraction> {
        let mut params = vec![
            ("traffic_volume_id", query.traffic_volume_id.clone()),
            ("ref_time_str", query.ref_time_str.clone()),
        ];
        if let Some(threshold) = query.threshold {
            params.push(("threshold", threshold.to_string()));
        }
        if let Some(resolution) = query.resolution {
            params.push(("resolution", resolution.to_string()));
        }
        if let Some(seed) = query.seed {
            params.push(("seed", seed.to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if !query.flight_ids.is_empty() {
            params.push(("flight_ids", query.flight_ids.join(",")));
        }
        self.get_json("/flow_extraction", &params, "flow extraction")
            .await
    }

    /// Run the regulation plan simulation. Empty plans are rejected locally.
    pub async fn simulate_plan(&self, request: &SimulationRequest) -> Result<SimulationResult> {
        if request.regulations.is_empty() {
            bail!("No regulations provided");
        }
        self.post_json(
            "/regulation_plan_simulation",
            request,
            "regulation plan simulation",
        )
        .await
    }
}
