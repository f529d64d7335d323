use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const RELAY_NET_ADDRESS: &str = ":4160";

/// The node's `config.json`.
///
/// Settings the installer knows about are named fields, anything else found in
/// an existing document is kept in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeConfig {
    pub version: u32,
    pub gossip_fanout: u32,
    pub net_address: String,
    pub base_logger_debug_level: u32,
    pub incoming_connections_limit: u64,
    pub archival: bool,
    pub enable_metric_reporting: bool,
    #[serde(rename = "EnableDeveloperAPI")]
    pub enable_developer_api: bool,
    pub enable_profiler: bool,
    pub endpoint_address: String,
    pub rest_read_timeout_seconds: u64,
    pub rest_write_timeout_seconds: u64,
    pub run_hosted: bool,
    pub suggested_fee_block_history: u32,
    pub tx_pool_size: u64,
    pub enable_ledger_service: bool,
    pub enable_block_service: bool,
    pub enable_gossip_block_service: bool,
    pub catchup_block_fetch_timeout_sec: u64,
    pub deadlock_detection: i32,
    #[serde(rename = "DNSBootstrapID")]
    pub dns_bootstrap_id: String,
    pub enable_telemetry: bool,
    #[serde(rename = "TelemetryURI")]
    pub telemetry_uri: String,
    #[serde(rename = "EnableAPIAuth")]
    pub enable_api_auth: bool,
    pub node_exporter_listen_address: String,
    pub catchup_parallel_blocks: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            version: 34,
            gossip_fanout: 4,
            net_address: String::new(),
            base_logger_debug_level: 4,
            incoming_connections_limit: 2400,
            archival: false,
            enable_metric_reporting: false,
            enable_developer_api: false,
            enable_profiler: false,
            endpoint_address: "127.0.0.1:8080".to_owned(),
            rest_read_timeout_seconds: 15,
            rest_write_timeout_seconds: 120,
            run_hosted: false,
            suggested_fee_block_history: 3,
            tx_pool_size: 75000,
            enable_ledger_service: false,
            enable_block_service: false,
            enable_gossip_block_service: true,
            catchup_block_fetch_timeout_sec: 4,
            deadlock_detection: 0,
            dns_bootstrap_id: "<network>.algorand.network".to_owned(),
            enable_telemetry: false,
            telemetry_uri: String::new(),
            enable_api_auth: true,
            node_exporter_listen_address: String::new(),
            catchup_parallel_blocks: 16,
            extra: BTreeMap::new(),
        }
    }
}

/// A partial `config.json`: only the settings that are `Some` (and the
/// entries of `extra`) are applied by [`NodeConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NodeConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gossip_fanout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_logger_debug_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_connections_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archival: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_metric_reporting: Option<bool>,
    #[serde(
        rename = "EnableDeveloperAPI",
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_developer_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_profiler: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest_read_timeout_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest_write_timeout_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_hosted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fee_block_history: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_pool_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_ledger_service: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_block_service: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_gossip_block_service: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catchup_block_fetch_timeout_sec: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadlock_detection: Option<i32>,
    #[serde(rename = "DNSBootstrapID", skip_serializing_if = "Option::is_none")]
    pub dns_bootstrap_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_telemetry: Option<bool>,
    #[serde(rename = "TelemetryURI", skip_serializing_if = "Option::is_none")]
    pub telemetry_uri: Option<String>,
    #[serde(rename = "EnableAPIAuth", skip_serializing_if = "Option::is_none")]
    pub enable_api_auth: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_exporter_listen_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catchup_parallel_blocks: Option<u32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NodeConfigUpdate {
    /// Overrides applied to every relay node.
    pub fn relay_overlay() -> Self {
        NodeConfigUpdate {
            net_address: Some(RELAY_NET_ADDRESS.to_owned()),
            incoming_connections_limit: Some(10000),
            archival: Some(true),
            enable_block_service: Some(true),
            enable_ledger_service: Some(true),
            ..Default::default()
        }
    }

    /// Builds an update from `Key=Value` pairs. A value is read as JSON when
    /// it parses as such (`true`, `16`, `"text"`), as a plain string otherwise.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, super::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut document = Map::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair
                .split_once('=')
                .filter(|(key, _)| !key.trim().is_empty())
                .ok_or_else(|| super::Error::InvalidSetting(pair.to_owned()))?;
            let value = serde_json::from_str(value.trim())
                .unwrap_or_else(|_| Value::String(value.to_owned()));
            document.insert(key.trim().to_owned(), value);
        }
        serde_json::from_value(Value::Object(document)).map_err(super::Error::InvalidUpdate)
    }
}

macro_rules! merge_fields {
    ($target:ident, $update:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $update.$field {
                $target.$field = value;
            }
        )+
    };
}

impl NodeConfig {
    /// Built-in defaults, with the relay overrides on top for relays.
    pub fn for_role(is_relay: bool) -> Self {
        let mut config = NodeConfig::default();
        if is_relay {
            config.merge(NodeConfigUpdate::relay_overlay());
        }
        config
    }

    /// Applies every setting present in `update`, last write wins.
    pub fn merge(&mut self, update: NodeConfigUpdate) {
        self.extra.extend(update.extra);
        merge_fields!(
            self,
            update,
            version,
            gossip_fanout,
            net_address,
            base_logger_debug_level,
            incoming_connections_limit,
            archival,
            enable_metric_reporting,
            enable_developer_api,
            enable_profiler,
            endpoint_address,
            rest_read_timeout_seconds,
            rest_write_timeout_seconds,
            run_hosted,
            suggested_fee_block_history,
            tx_pool_size,
            enable_ledger_service,
            enable_block_service,
            enable_gossip_block_service,
            catchup_block_fetch_timeout_sec,
            deadlock_detection,
            dns_bootstrap_id,
            enable_telemetry,
            telemetry_uri,
            enable_api_auth,
            node_exporter_listen_address,
            catchup_parallel_blocks,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relay_keys_follow_the_role() {
        let plain = NodeConfig::for_role(false);
        assert_eq!(plain.net_address, "");
        assert_eq!(plain.incoming_connections_limit, 2400);
        assert!(!plain.archival);
        assert!(!plain.enable_block_service);
        assert!(!plain.enable_ledger_service);

        let relay = NodeConfig::for_role(true);
        assert_eq!(relay.net_address, RELAY_NET_ADDRESS);
        assert_eq!(relay.incoming_connections_limit, 10000);
        assert!(relay.archival);
        assert!(relay.enable_block_service);
        assert!(relay.enable_ledger_service);

        // everything else is shared
        assert_eq!(relay.tx_pool_size, plain.tx_pool_size);
        assert_eq!(relay.dns_bootstrap_id, plain.dns_bootstrap_id);
    }

    #[test]
    fn last_write_wins() {
        let mut config = NodeConfig::default();
        config.merge(NodeConfigUpdate {
            gossip_fanout: Some(8),
            ..Default::default()
        });
        config.merge(NodeConfigUpdate {
            gossip_fanout: Some(2),
            archival: Some(true),
            ..Default::default()
        });
        assert_eq!(config.gossip_fanout, 2);
        assert!(config.archival);
    }

    #[test]
    fn serializes_with_node_key_names() {
        let value = serde_json::to_value(NodeConfig::default()).unwrap();
        assert_eq!(value["DNSBootstrapID"], json!("<network>.algorand.network"));
        assert_eq!(value["EnableDeveloperAPI"], json!(false));
        assert_eq!(value["EnableAPIAuth"], json!(true));
        assert_eq!(value["TelemetryURI"], json!(""));
        assert_eq!(value["CatchupParallelBlocks"], json!(16));
        assert_eq!(value.as_object().unwrap().len(), 26);
    }

    #[test]
    fn unknown_keys_pass_through() {
        let update: NodeConfigUpdate =
            serde_json::from_value(json!({ "Archival": true, "ForceRelayMessages": true }))
                .unwrap();
        assert_eq!(update.archival, Some(true));
        assert_eq!(update.extra["ForceRelayMessages"], json!(true));

        let mut config = NodeConfig::default();
        config.merge(update);
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["ForceRelayMessages"], json!(true));
    }

    #[test]
    fn pairs_are_typed_when_possible() {
        let update = NodeConfigUpdate::from_pairs(vec![
            "Archival=true",
            "GossipFanout=8",
            "EndpointAddress=0.0.0.0:8080",
            "CustomSetting=abc",
        ])
        .unwrap();
        assert_eq!(update.archival, Some(true));
        assert_eq!(update.gossip_fanout, Some(8));
        assert_eq!(update.endpoint_address.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(update.extra["CustomSetting"], json!("abc"));
    }

    #[test]
    fn malformed_pairs_are_rejected() {
        assert!(matches!(
            NodeConfigUpdate::from_pairs(vec!["Archival"]),
            Err(crate::config::Error::InvalidSetting(_))
        ));
        assert!(matches!(
            NodeConfigUpdate::from_pairs(vec!["GossipFanout=many"]),
            Err(crate::config::Error::InvalidUpdate(_))
        ));
    }
}
