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

use crate::error::ChainQueryError;
use crate::http_client::HttpClient;
use crate::types::Name;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWeight {
    pub key: String,
    #[serde(default)]
    pub weight: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Authority {
    #[serde(default)]
    pub threshold: u32,
    #[serde(default)]
    pub keys: Vec<KeyWeight>,
    #[serde(default)]
    pub accounts: Vec<serde_json::Value>,
    #[serde(default)]
    pub waits: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub perm_name: Name,
    #[serde(default)]
    pub parent: Option<Name>,
    #[serde(default)]
    pub required_auth: Authority,
}

/// The part of a `get_account` response account validation relies on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountPermissions {
    #[serde(default)]
    pub account_name: Option<Name>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

#[async_trait]
pub trait ChainQuery: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn get_account(&self, account_name: &Name) -> Result<AccountPermissions, Self::Error>;
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    what: String,
    #[serde(default)]
    details: Vec<ApiErrorDetail>,
}

/// Error payload returned by the chain API on failure.
#[derive(Deserialize)]
struct ApiErrorResponse {
    code: i64,
    #[serde(default)]
    message: String,
    error: ApiErrorBody,
}

impl From<ApiErrorResponse> for ChainQueryError {
    fn from(value: ApiErrorResponse) -> Self {
        // the first detail is what the node actually complains about, "what" and the
        // top-level message are generic
        let message = value
            .error
            .details
            .into_iter()
            .next()
            .map(|detail| detail.message)
            .filter(|message| !message.is_empty())
            .or_else(|| Some(value.error.what).filter(|what| !what.is_empty()))
            .unwrap_or(value.message);

        ChainQueryError::Api {
            code: value.code,
            name: value.error.name,
            message,
        }
    }
}

/// [`ChainQuery`] speaking the node's JSON API over any [`HttpClient`].
#[derive(Clone)]
pub struct HttpChainQuery<Http: HttpClient> {
    endpoint: String,
    http_client: Http,
}

impl<Http: HttpClient> HttpChainQuery<Http> {
    pub fn new_custom(endpoint: impl Into<String>, http_client: Http) -> Self {
        let endpoint: String = endpoint.into();

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http_client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl<Http: HttpClient> ChainQuery for HttpChainQuery<Http> {
    type Error = ChainQueryError;

    async fn get_account(&self, account_name: &Name) -> Result<AccountPermissions, Self::Error> {
        let url = format!("{}/v1/chain/get_account", self.endpoint);

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        let body = json!({ "account_name": account_name });

        let response = self
            .http_client
            .post(&url, headers, body)
            .await
            .map_err(|err| ChainQueryError::Http(Box::new(err)))?;

        if !response.is_success() {
            return match serde_json::from_str::<ApiErrorResponse>(&response.text) {
                Ok(api_error) => Err(api_error.into()),
                Err(_) => Err(ChainQueryError::UnexpectedStatus {
                    url,
                    status: response.status,
                    response: response.text,
                }),
            };
        }

        Ok(serde_json::from_str(&response.text)?)
    }
}
