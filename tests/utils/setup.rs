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

use crate::utils::mocks::{MockChainQuery, MockLinkState, MockStorage, MockWalletLink};
use anchor_session::authenticator::Authenticator;
use anchor_session::options::AuthenticatorOptions;
use anchor_session::types::{Chain, ChainId, RpcEndpoint};
use std::sync::Arc;

pub const CHAIN_ID: &str = "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906";
pub const OTHER_CHAIN_ID: &str = "1064487b3cd1a897ce03ae5b6a865651747e2e152090f99c1d19d44e01aea5a4";
pub const APP_NAME: &str = "anchor-session-tests";

pub type TestAuthenticator = Authenticator<MockWalletLink, MockChainQuery, MockStorage>;

pub struct Setup {
    pub link_state: Arc<MockLinkState>,
    pub link: MockWalletLink,
    pub chain_query: MockChainQuery,
    pub storage: MockStorage,
    pub authenticator: TestAuthenticator,
}

impl Setup {
    /// Another authenticator over the same wallet and storage, as after an app restart.
    pub fn restart(&self) -> anyhow::Result<TestAuthenticator> {
        Ok(Authenticator::new(
            vec![chain(CHAIN_ID)],
            AuthenticatorOptions::new(APP_NAME),
            self.link.clone(),
            self.chain_query.clone(),
            self.storage.clone(),
        )?)
    }
}

pub fn chain(chain_id: &str) -> Chain {
    Chain {
        chain_id: ChainId::from(chain_id),
        rpc_endpoints: vec![RpcEndpoint {
            protocol: "https".to_string(),
            host: "eos.greymass.com".to_string(),
            port: 443,
        }],
    }
}

pub fn setup() -> anyhow::Result<Setup> {
    setup_with_chains(vec![chain(CHAIN_ID)])
}

pub fn setup_with_chains(chains: Vec<Chain>) -> anyhow::Result<Setup> {
    let link_state = Arc::new(MockLinkState::new(CHAIN_ID));
    let link = MockWalletLink {
        state: Arc::clone(&link_state),
    };
    let chain_query = MockChainQuery::default();
    let storage = MockStorage::default();

    let authenticator = Authenticator::new(
        chains,
        AuthenticatorOptions::new(APP_NAME),
        link.clone(),
        chain_query.clone(),
        storage.clone(),
    )?;

    Ok(Setup {
        link_state,
        link,
        chain_query,
        storage,
        authenticator,
    })
}

/// Initialized authenticator holding a session for `alice@active`.
pub async fn setup_logged_in() -> anyhow::Result<Setup> {
    let setup = setup()?;
    setup.authenticator.init().await;
    setup.authenticator.login().await?;

    Ok(setup)
}
