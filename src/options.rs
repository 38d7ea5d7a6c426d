// Copyright 2025 Quentin Diebold
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::types::{Chain, ChainId};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVICE: &str = "https://cb.anchor.link";
pub const DEFAULT_FUEL_REFERRER: &str = "teamgreymass";

/// Options accepted by [`Authenticator::new`](crate::authenticator::Authenticator::new).
///
/// Deserializable so that a host application can keep them next to the rest of its
/// configuration. Only `app_name` is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorOptions {
    /// Short string identifying the application to the wallet.
    pub app_name: String,
    /// Callback service used by the wallet link.
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default)]
    pub disable_greymass_fuel: bool,
    /// Let the link transport display its own request status.
    #[serde(default)]
    pub request_status: bool,
    /// Referral account used in Fuel transactions.
    #[serde(default = "default_fuel_referrer")]
    pub fuel_referrer: String,
    /// Verify identity proofs returned on login.
    #[serde(default)]
    pub verify_proofs: bool,
    /// Namespace of the persisted session records, `anchor-link-{app_name}` when unset.
    #[serde(default)]
    pub storage_prefix: Option<String>,
}

fn default_service() -> String {
    DEFAULT_SERVICE.to_string()
}

fn default_fuel_referrer() -> String {
    DEFAULT_FUEL_REFERRER.to_string()
}

impl AuthenticatorOptions {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            service: default_service(),
            disable_greymass_fuel: false,
            request_status: false,
            fuel_referrer: default_fuel_referrer(),
            verify_proofs: false,
            storage_prefix: None,
        }
    }

    pub fn storage_prefix(&self) -> String {
        match &self.storage_prefix {
            Some(prefix) if !prefix.is_empty() => prefix.clone(),
            _ => format!("anchor-link-{}", self.app_name),
        }
    }

    /// Builds the configuration handed to the wallet link for `chain`.
    ///
    /// Returns `None` when the chain has no rpc endpoint.
    pub fn link_config(&self, chain: &Chain) -> Option<LinkConfig> {
        let endpoint = chain.rpc_endpoints.first()?;

        Some(LinkConfig {
            chain_id: chain.chain_id.clone(),
            node_url: endpoint.url(),
            service: self.service.clone(),
            verify_proofs: self.verify_proofs,
            transport: TransportOptions {
                request_status: self.request_status,
                disable_greymass_fuel: self.disable_greymass_fuel,
                fuel_referrer: self.fuel_referrer.clone(),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportOptions {
    pub request_status: bool,
    pub disable_greymass_fuel: bool,
    pub fuel_referrer: String,
}

/// What a [`WalletLink`](crate::wallet_link::WalletLink) needs to establish itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkConfig {
    pub chain_id: ChainId,
    pub node_url: String,
    pub service: String,
    pub verify_proofs: bool,
    pub transport: TransportOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactOptions {
    #[serde(default = "default_broadcast")]
    pub broadcast: bool,
    #[serde(default = "default_blocks_behind")]
    pub blocks_behind: u32,
    #[serde(default = "default_expire_seconds")]
    pub expire_seconds: u32,
}

fn default_broadcast() -> bool {
    true
}

fn default_blocks_behind() -> u32 {
    3
}

fn default_expire_seconds() -> u32 {
    30
}

impl Default for TransactOptions {
    fn default() -> Self {
        Self {
            broadcast: default_broadcast(),
            blocks_behind: default_blocks_behind(),
            expire_seconds: default_expire_seconds(),
        }
    }
}

impl TransactOptions {
    pub fn without_broadcast() -> Self {
        Self {
            broadcast: false,
            ..Default::default()
        }
    }
}
