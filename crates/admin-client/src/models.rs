//! Response and request bodies of the `/admin` endpoints
//!
//! Field names follow the middleware's JSON. Everything except the wallet
//! balance is camelCase; the balance endpoint passes the node's snake_case
//! through unchanged.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub chain: String,
    pub network: String,
}

/// `GET /admin/node-info`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeInfo {
    pub version: String,
    pub commit_hash: String,
    pub identity_pubkey: String,
    pub alias: String,
    pub color: String,
    pub num_pending_channels: u32,
    pub num_active_channels: u32,
    pub num_inactive_channels: u32,
    pub num_peers: u32,
    pub block_height: u64,
    pub block_hash: String,
    pub synced_to_chain: bool,
    pub synced_to_graph: bool,
    pub chains: Vec<Chain>,
    pub uris: Vec<String>,
}

/// `GET /admin/wallet/balance`, amounts in satoshis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub confirmed_balance: i64,
    pub unconfirmed_balance: i64,
}

impl WalletBalance {
    pub fn total(&self) -> i64 {
        self.confirmed_balance + self.unconfirmed_balance
    }
}

/// `POST /admin/wallet/address`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Channel {
    pub channel_point: String,
    pub remote_pubkey: String,
    pub capacity: i64,
    pub local_balance: i64,
    pub remote_balance: i64,
    pub active: bool,
    pub private_channel: bool,
}

/// `GET /admin/channels` envelope. A missing list means no channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct ChannelList {
    #[serde(default)]
    pub channels: Option<Vec<Channel>>,
}

/// Body of `POST /admin/channels/open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenChannelRequest {
    pub node_pubkey: String,
    pub local_funding_amount: i64,
    #[serde(default)]
    pub push_sat: i64,
    #[serde(default)]
    pub private_channel: bool,
}

/// A peer the node currently holds a connection to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Peer {
    pub pub_key: String,
    pub address: String,
}

/// A node from the network graph the middleware suggests connecting to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteNode {
    pub pub_key: String,
    pub alias: String,
    pub addresses: Vec<String>,
    pub capacity: i64,
    pub num_channels: u32,
    pub betweenness_centrality: f64,
}

/// `GET /admin/remotes` envelope.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct RemoteList {
    #[serde(default)]
    pub nodes: Option<Vec<RemoteNode>>,
}

/// Body of `POST /admin/connect-peer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectPeerRequest<'a> {
    pub pubkey: &'a str,
    pub host: &'a str,
}
