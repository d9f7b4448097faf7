use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use smeshmon_types::{
    EligibilitiesByIdentity, Identity, Millis, NetworkInfo, NodeStatus, PoetInfo,
    ProposalsByIdentity, Reward, SmesherEvent, WindowQuery,
};

use crate::schema::{
    EligibilitiesResponse, NetworkInfoResponse, NodeStatusResponse, PoetInfoResponse,
    ProposalsResponse, RewardsResponse, StatesResponse,
};
use crate::{Result, RpcError, SmesherApi};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `SmesherApi` backed by the node's JSON gateway
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    rpc: String,
}

impl HttpApi {
    pub fn new(rpc: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, rpc))
    }

    pub fn with_client(client: reqwest::Client, rpc: impl Into<String>) -> Self {
        let rpc = rpc.into().trim_end_matches('/').to_string();
        HttpApi { client, rpc }
    }

    pub fn rpc(&self) -> &str {
        &self.rpc
    }

    fn url(&self, method: &str) -> String {
        format!("{}/spacemesh.{}", self.rpc, method)
    }

    async fn post<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T> {
        let url = self.url(method);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(&body).send().await?;
        Self::decode(url, response).await
    }

    async fn get<T: DeserializeOwned>(&self, method: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(method);
        debug!("GET {} {:?}", url, query);
        let response = self.client.get(&url).query(query).send().await?;
        Self::decode(url, response).await
    }

    async fn decode<T: DeserializeOwned>(url: String, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn format_time(time: Millis) -> Result<String> {
    DateTime::from_timestamp_millis(time)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| RpcError::Decode(format!("timestamp out of range: {}", time)))
}

#[async_trait]
impl SmesherApi for HttpApi {
    async fn network_info(&self) -> Result<NetworkInfo> {
        let response: NetworkInfoResponse = self.post("v2alpha1.NetworkService/Info", json!({})).await?;
        response.into_domain()
    }

    async fn node_status(&self) -> Result<NodeStatus> {
        let response: NodeStatusResponse = self.post("v2alpha1.NodeService/Status", json!({})).await?;
        Ok(response.into_domain())
    }

    async fn poet_info(&self) -> Result<PoetInfo> {
        let response: PoetInfoResponse = self
            .post("v2alpha1.SmeshingIdentitiesService/PoetInfo", json!({}))
            .await?;
        response.into_domain()
    }

    async fn smesher_states_chunk(&self, query: &WindowQuery) -> Result<Vec<SmesherEvent>> {
        let mut params = vec![
            ("limit", query.limit.to_string()),
            ("order", query.order.to_string()),
            ("to", format_time(query.to)?),
        ];
        if let Some(from) = query.from {
            params.push(("from", format_time(from)?));
        }
        let response: StatesResponse = self
            .get("v2beta1.SmeshingIdentitiesService/States", &params)
            .await?;
        response.into_domain()
    }

    async fn rewards_chunk(
        &self,
        identity: &Identity,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Reward>> {
        let body = json!({
            "smesher": identity.to_base64(),
            "limit": limit,
            "offset": offset,
        });
        let response: RewardsResponse = self.post("v2alpha1.RewardService/List", body).await?;
        response.into_domain()
    }

    async fn proposals(&self) -> Result<ProposalsByIdentity> {
        let response: ProposalsResponse = self
            .post("v2alpha1.SmeshingIdentitiesService/Proposals", json!({}))
            .await?;
        response.into_domain()
    }

    async fn eligibilities(&self) -> Result<EligibilitiesByIdentity> {
        let response: EligibilitiesResponse = self
            .post("v2alpha1.SmeshingIdentitiesService/Eligibilities", json!({}))
            .await?;
        response.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let api = HttpApi::with_client(reqwest::Client::new(), "http://localhost:9071/");
        assert_eq!(api.rpc(), "http://localhost:9071");
        assert_eq!(
            api.url("v2alpha1.NetworkService/Info"),
            "http://localhost:9071/spacemesh.v2alpha1.NetworkService/Info"
        );
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0).unwrap(), "1970-01-01T00:00:00.000Z");
        assert_eq!(format_time(1_500).unwrap(), "1970-01-01T00:00:01.500Z");
    }
}
