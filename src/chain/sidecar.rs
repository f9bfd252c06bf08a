//! substrate-api-sidecar adapter
//!
//! Reads pallet storage through the sidecar REST API
//! (`/pallets/{pallet}/storage/{item}?keys[]=...`). Sidecar renders big
//! integers as decimal strings, so numeric fields accept both forms.

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::{ChainFuture, ChainSource};
use crate::models::{EraPoints, IdentityInfo, SlashingInfo, ValidatorSnapshot};

/// Commission is stored as Perbill; dividing by this yields percent.
const PERBILL_PER_PERCENT: f64 = 10_000_000.0;

#[derive(Debug, Clone)]
pub struct SidecarClient {
    client: Client,
    base_url: String,
}

impl SidecarClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build chain HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Verify the sidecar is reachable; used once at startup.
    pub async fn check_connection(&self) -> Result<String> {
        let url = format!("{}/node/version", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach chain API at {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Chain API health check failed with {}", status));
        }

        let payload: Value = response
            .json()
            .await
            .context("Failed to parse chain API version response")?;
        let chain = payload
            .get("chain")
            .and_then(Value::as_str)
            .unwrap_or("unknown chain");
        Ok(chain.to_string())
    }

    async fn storage(&self, pallet: &str, item: &str, keys: &[&str]) -> Result<Value> {
        let url = format!("{}/pallets/{}/storage/{}", self.base_url, pallet, item);
        let query: Vec<(&str, &str)> = keys.iter().map(|k| ("keys[]", *k)).collect();

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .with_context(|| format!("Failed to query {}.{}", pallet, item))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "{}.{} query failed with {}: {}",
                pallet,
                item,
                status,
                body
            ));
        }

        let mut payload: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {}.{} response", pallet, item))?;

        Ok(payload.get_mut("value").map(Value::take).unwrap_or(Value::Null))
    }

    async fn load_snapshot(&self, address: &str, era: u32) -> Result<ValidatorSnapshot> {
        let previous_era = era
            .checked_sub(1)
            .ok_or_else(|| anyhow!("Era {} has no completed predecessor", era))?
            .to_string();

        let address_keys = [address];
        let era_keys = [previous_era.as_str()];
        let (identity, slashes, prefs, points) = tokio::try_join!(
            self.storage("identity", "identityOf", &address_keys),
            self.storage("staking", "slashingSpans", &address_keys),
            self.storage("staking", "validators", &address_keys),
            self.storage("staking", "erasRewardPoints", &era_keys),
        )?;

        let mut identity = parse_identity(&identity);
        if let Some(info) = identity.as_mut().filter(|info| info.display.is_none()) {
            let super_of = self.storage("identity", "superOf", &[address]).await?;
            info.parent = parse_super_of(&super_of);
        }

        Ok(ValidatorSnapshot {
            address: address.to_string(),
            identity,
            slashing: parse_slashing_spans(&slashes)?,
            commission: parse_commission(&prefs),
            era_points: parse_era_points(&points, address),
        })
    }
}

impl ChainSource for SidecarClient {
    fn active_validators(&self) -> ChainFuture<'_, Vec<String>> {
        Box::pin(async move {
            let value = self.storage("session", "validators", &[]).await?;
            let list = value
                .as_array()
                .ok_or_else(|| anyhow!("session.validators is not a list"))?;
            Ok(list
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect())
        })
    }

    fn current_era(&self) -> ChainFuture<'_, Option<u32>> {
        Box::pin(async move {
            let value = self.storage("staking", "currentEra", &[]).await?;
            Ok(value_as_u64(&value).and_then(|era| u32::try_from(era).ok()))
        })
    }

    fn fetch_snapshot<'a>(
        &'a self,
        address: &'a str,
        era: u32,
    ) -> ChainFuture<'a, ValidatorSnapshot> {
        Box::pin(self.load_snapshot(address, era))
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn field_u32(value: &Value, key: &str) -> Result<u32> {
    value
        .get(key)
        .and_then(value_as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| anyhow!("slashing span field '{}' missing or invalid", key))
}

fn parse_slashing_spans(value: &Value) -> Result<Option<SlashingInfo>> {
    if value.is_null() {
        return Ok(None);
    }

    let prior = value
        .get("prior")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(value_as_u64)
                .filter_map(|v| u32::try_from(v).ok())
                .collect()
        })
        .unwrap_or_default();

    Ok(Some(SlashingInfo {
        span_index: field_u32(value, "spanIndex")?,
        last_start: field_u32(value, "lastStart")?,
        last_nonzero_slash: field_u32(value, "lastNonzeroSlash")?,
        prior,
    }))
}

fn parse_commission(value: &Value) -> f64 {
    value
        .get("commission")
        .and_then(value_as_u64)
        .map(|perbill| perbill as f64 / PERBILL_PER_PERCENT)
        .unwrap_or(0.0)
}

fn parse_era_points(value: &Value, address: &str) -> EraPoints {
    let total = value.get("total").and_then(value_as_u64).unwrap_or(0);

    // `individual` is a map on newer sidecar versions, a list of pairs on older ones.
    let share = match value.get("individual") {
        Some(Value::Object(map)) => map.get(address).and_then(value_as_u64),
        Some(Value::Array(pairs)) => pairs.iter().find_map(|pair| {
            let pair = pair.as_array()?;
            (pair.first()?.as_str()? == address)
                .then(|| pair.get(1).and_then(value_as_u64))
                .flatten()
        }),
        _ => None,
    }
    .unwrap_or(0);

    EraPoints::new(total, share)
}

fn parse_identity(value: &Value) -> Option<IdentityInfo> {
    // Newer runtimes store `(Registration, Option<Username>)`.
    let registration = match value {
        Value::Null => return None,
        Value::Array(items) => items.first()?,
        other => other,
    };
    if registration.is_null() {
        return None;
    }

    let display = registration
        .get("info")
        .and_then(|info| info.get("display"))
        .and_then(decode_data_field);

    Some(IdentityInfo {
        display,
        parent: None,
    })
}

fn parse_super_of(value: &Value) -> Option<String> {
    let parent = value.as_array()?.first()?.as_str()?;
    Some(crate::chain::format_address(parent))
}

/// Decode an identity `Data` field (`{"raw": "0x..."}`) into text.
fn decode_data_field(value: &Value) -> Option<String> {
    let raw = value
        .get("raw")
        .or_else(|| value.get("Raw"))
        .and_then(Value::as_str)?;

    let Some(encoded) = raw.strip_prefix("0x") else {
        return (!raw.is_empty()).then(|| raw.to_string());
    };

    let bytes = hex::decode(encoded).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    (!text.is_empty()).then_some(text)
}
