//! Typed wrappers over the `/admin` endpoints
//!
//! Pure request shaping: every call goes through `ApiClient::request` and so
//! inherits bearer attachment and the refresh protocol.

use std::collections::HashSet;

use serde_json::Value;
use tracing::info;

use crate::client::{ApiClient, RequestOptions};
use crate::error::{Error, Result};
use crate::models::{
    Channel, ChannelList, ConnectPeerRequest, NewAddress, NodeInfo, OpenChannelRequest, Peer,
    RemoteList, RemoteNode, WalletBalance,
};

pub const NODE_INFO_PATH: &str = "/admin/node-info";
pub const WALLET_BALANCE_PATH: &str = "/admin/wallet/balance";
pub const WALLET_ADDRESS_PATH: &str = "/admin/wallet/address";
pub const CHANNELS_PATH: &str = "/admin/channels";
pub const OPEN_CHANNEL_PATH: &str = "/admin/channels/open";
pub const PEERS_PATH: &str = "/admin/peers";
pub const REMOTES_PATH: &str = "/admin/remotes";
pub const CONNECT_PEER_PATH: &str = "/admin/connect-peer";

impl ApiClient {
    pub async fn node_info(&self) -> Result<NodeInfo> {
        self.request_json(NODE_INFO_PATH, RequestOptions::get()).await
    }

    pub async fn wallet_balance(&self) -> Result<WalletBalance> {
        self.request_json(WALLET_BALANCE_PATH, RequestOptions::get())
            .await
    }

    /// Ask the node for a fresh on-chain receive address.
    pub async fn new_address(&self) -> Result<NewAddress> {
        let address: NewAddress = self
            .request_json(WALLET_ADDRESS_PATH, RequestOptions::post_empty())
            .await?;
        info!(address = %address.address, "generated wallet address");
        Ok(address)
    }

    pub async fn channels(&self) -> Result<Vec<Channel>> {
        let list: ChannelList = self
            .request_json(CHANNELS_PATH, RequestOptions::get())
            .await?;
        Ok(list.channels.unwrap_or_default())
    }

    /// Open a channel. Returns whatever the backend reports for the funding
    /// transaction.
    pub async fn open_channel(&self, request: &OpenChannelRequest) -> Result<Value> {
        let body = serde_json::to_value(request).map_err(|e| Error::InvalidRequest(e.to_string()))?;
        let result = self
            .request(OPEN_CHANNEL_PATH, RequestOptions::post(body))
            .await?;
        info!(
            node_pubkey = %request.node_pubkey,
            local_funding_amount = request.local_funding_amount,
            "channel open requested"
        );
        Ok(result)
    }

    pub async fn peers(&self) -> Result<Vec<Peer>> {
        let peers: Option<Vec<Peer>> = self.request_json(PEERS_PATH, RequestOptions::get()).await?;
        Ok(peers.unwrap_or_default())
    }

    pub async fn remotes(&self) -> Result<Vec<RemoteNode>> {
        let list: RemoteList = self
            .request_json(REMOTES_PATH, RequestOptions::get())
            .await?;
        Ok(list.nodes.unwrap_or_default())
    }

    pub async fn connect_peer(&self, pubkey: &str, host: &str) -> Result<()> {
        let body = serde_json::to_value(ConnectPeerRequest { pubkey, host })
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;
        self.request(CONNECT_PEER_PATH, RequestOptions::post(body))
            .await?;
        info!(pubkey, host, "peer connection requested");
        Ok(())
    }

    /// Connect to a suggested node through its first advertised address.
    pub async fn connect_node(&self, node: &RemoteNode) -> Result<()> {
        let host = node
            .addresses
            .first()
            .filter(|a| !a.is_empty())
            .ok_or(Error::NoAdvertisedAddress)?;
        self.connect_peer(&node.pub_key, host).await
    }
}

/// Suggested nodes the local node is not already connected to, in the order
/// the backend ranked them.
pub fn recommended_nodes(remotes: Vec<RemoteNode>, peers: &[Peer]) -> Vec<RemoteNode> {
    let connected: HashSet<&str> = peers.iter().map(|p| p.pub_key.as_str()).collect();
    remotes
        .into_iter()
        .filter(|node| !connected.contains(node.pub_key.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use admin_auth::MemoryCredentialStore;
    use axum::Json;
    use axum::extract::State;
    use axum::routing::{get, post};
    use tokio::net::TcpListener;

    /// Bodies received by POST routes, keyed by path.
    type Received = Arc<Mutex<Vec<(&'static str, Value)>>>;

    async fn start_admin_backend(channels: Value, remotes: Value) -> (String, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new()
            .route(
                "/v1/admin/node-info",
                get(|| async {
                    Json(serde_json::json!({
                        "alias": "aratiri",
                        "identityPubkey": "02aa",
                        "numPeers": 2,
                        "chains": [{"chain": "bitcoin", "network": "regtest"}]
                    }))
                }),
            )
            .route(
                "/v1/admin/wallet/balance",
                get(|| async {
                    Json(serde_json::json!({"confirmed_balance": 900, "unconfirmed_balance": 100}))
                }),
            )
            .route(
                "/v1/admin/wallet/address",
                post(|body: String| async move {
                    assert!(body.is_empty(), "address request carries no body");
                    Json(serde_json::json!({"address": "bcrt1qexample"}))
                }),
            )
            .route(
                "/v1/admin/channels",
                get(move || {
                    let channels = channels.clone();
                    async move { Json(channels) }
                }),
            )
            .route(
                "/v1/admin/remotes",
                get(move || {
                    let remotes = remotes.clone();
                    async move { Json(remotes) }
                }),
            )
            .route(
                "/v1/admin/peers",
                get(|| async { Json(serde_json::json!([{"pubKey": "03bb", "address": "10.0.0.2:9735"}])) }),
            )
            .route(
                "/v1/admin/channels/open",
                post(|State(received): State<Received>, Json(body): Json<Value>| async move {
                    received.lock().unwrap().push(("open", body));
                    Json(Value::String("f00dtxid".into()))
                }),
            )
            .route(
                "/v1/admin/connect-peer",
                post(|State(received): State<Received>, Json(body): Json<Value>| async move {
                    received.lock().unwrap().push(("connect", body));
                    Json(serde_json::json!({}))
                }),
            )
            .with_state(received.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1"), received)
    }

    fn client(base: &str) -> ApiClient {
        let store = Arc::new(MemoryCredentialStore::with_tokens(Some("at"), Some("rt")));
        ApiClient::new(base, store, Duration::from_secs(5)).unwrap()
    }

    fn remote(pub_key: &str, addresses: &[&str]) -> RemoteNode {
        RemoteNode {
            pub_key: pub_key.into(),
            alias: format!("node-{pub_key}"),
            addresses: addresses.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn typed_reads() {
        let (base, _) = start_admin_backend(
            serde_json::json!({"channels": [{"channelPoint": "tx:0", "remotePubkey": "03bb", "active": true}]}),
            serde_json::json!({"nodes": [{"pubKey": "03bb"}, {"pubKey": "03cc"}]}),
        )
        .await;
        let client = client(&base);

        let info = client.node_info().await.unwrap();
        assert_eq!(info.alias, "aratiri");
        assert_eq!(info.num_peers, 2);

        let balance = client.wallet_balance().await.unwrap();
        assert_eq!(balance.confirmed_balance, 900);
        assert_eq!(balance.total(), 1000);

        let channels = client.channels().await.unwrap();
        assert_eq!(channels.len(), 1);
        assert!(channels[0].active);

        let peers = client.peers().await.unwrap();
        assert_eq!(peers[0].pub_key, "03bb");

        assert_eq!(client.remotes().await.unwrap().len(), 2);
        assert_eq!(client.new_address().await.unwrap().address, "bcrt1qexample");
    }

    #[tokio::test]
    async fn missing_lists_are_empty() {
        let (base, _) =
            start_admin_backend(serde_json::json!({}), serde_json::json!({"nodes": null})).await;
        let client = client(&base);

        assert!(client.channels().await.unwrap().is_empty());
        assert!(client.remotes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn writes_send_camel_case_bodies() {
        let (base, received) =
            start_admin_backend(serde_json::json!({}), serde_json::json!({})).await;
        let client = client(&base);

        let txid = client
            .open_channel(&OpenChannelRequest {
                node_pubkey: "03bb".into(),
                local_funding_amount: 250_000,
                push_sat: 1_000,
                private_channel: false,
            })
            .await
            .unwrap();
        assert_eq!(txid, "f00dtxid");

        client.connect_node(&remote("03cc", &["10.0.0.3:9735", "tor.onion:9735"])).await.unwrap();

        let received = received.lock().unwrap().clone();
        assert_eq!(received[0].0, "open");
        assert_eq!(received[0].1["nodePubkey"], "03bb");
        assert_eq!(received[0].1["localFundingAmount"], 250_000);
        assert_eq!(received[0].1["pushSat"], 1_000);
        assert_eq!(received[0].1["privateChannel"], false);
        assert_eq!(
            received[1],
            ("connect", serde_json::json!({"pubkey": "03cc", "host": "10.0.0.3:9735"}))
        );
    }

    #[tokio::test]
    async fn node_without_address_is_not_contacted() {
        let (base, received) =
            start_admin_backend(serde_json::json!({}), serde_json::json!({})).await;
        let client = client(&base);

        let err = client.connect_node(&remote("03dd", &[])).await.unwrap_err();

        assert_eq!(err.to_string(), "Node has no advertised address.");
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn recommended_nodes_skip_connected_peers() {
        let remotes = vec![remote("03aa", &[]), remote("03bb", &[]), remote("03cc", &[])];
        let peers = vec![Peer {
            pub_key: "03bb".into(),
            address: "10.0.0.2:9735".into(),
        }];

        let keys: Vec<String> = recommended_nodes(remotes, &peers)
            .into_iter()
            .map(|n| n.pub_key)
            .collect();
        assert_eq!(keys, vec!["03aa", "03cc"]);
    }
}
