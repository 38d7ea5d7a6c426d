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

use crate::chain_query::HttpChainQuery;
use crate::types::Chain;
use ::reqwest::Client;

/// [`HttpChainQuery`] preconfigured with a `reqwest::Client`.
///
/// This is the chain query enabled by the default `client` feature. When another
/// HTTP stack is required, disable default features, implement
/// [`HttpClient`](crate::http_client::HttpClient) for it and build the query with
/// [`HttpChainQuery::new_custom`].
///
/// # Examples
///
/// ```rust,no_run
/// use anchor_session::chain_query::ChainQuery;
/// use anchor_session::reqwest::chain_client::ReqwestChainQuery;
/// use anchor_session::types::Name;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let chain_query = ReqwestChainQuery::new("https://eos.greymass.com");
///     let account = chain_query.get_account(&Name::from("teamgreymass")).await?;
///
///     println!("{} permissions", account.permissions.len());
///     Ok(())
/// }
/// ```
pub type ReqwestChainQuery = HttpChainQuery<Client>;

impl ReqwestChainQuery {
    pub fn new(endpoint: impl Into<String>) -> ReqwestChainQuery {
        HttpChainQuery::new_custom(endpoint, Client::new())
    }

    /// Targets the first rpc endpoint of `chain`, `None` when it has none.
    pub fn from_chain(chain: &Chain) -> Option<ReqwestChainQuery> {
        let endpoint = chain.rpc_endpoints.first()?;

        Some(Self::new(endpoint.url()))
    }
}
