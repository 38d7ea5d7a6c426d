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

use crate::error::SessionStoreError;
use crate::session::Session;
use crate::storage::Storage;
use crate::types::{ChainId, Name};
use crate::wallet_link::{LinkSession, WalletLink};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Identity a persisted record is keyed by.
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct SessionId {
    pub chain_id: ChainId,
    pub account_name: Option<Name>,
}

impl SessionId {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            account_name: None,
        }
    }

    pub fn for_account(chain_id: ChainId, account_name: Name) -> Self {
        Self {
            chain_id,
            account_name: Some(account_name),
        }
    }
}

/// The JSON record written for a session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub chain_id: ChainId,
    pub actor: Name,
    pub permission: Name,
    /// Opaque blob produced by [`LinkSession::serialize`].
    pub link: serde_json::Value,
    /// Unix time in milliseconds.
    #[serde(default)]
    pub created_at: u64,
}

/// Sole owner of the persisted session records.
pub struct SessionStore<S: Storage> {
    storage: S,
    prefix: String,
}

// '-' separates segments, so it has to be escaped inside them, and '%' is escaped
// first so that escaped and literal sequences stay distinct.
fn escape_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace('-', "%2D")
}

impl<S: Storage> SessionStore<S> {
    pub fn new(storage: S, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `{prefix}-{chainId}[-{accountName}]`, with an empty account omitted.
    ///
    /// Every segment, the prefix included, is escaped, so keys never collide across
    /// prefixes either.
    pub fn key(&self, id: &SessionId) -> String {
        let mut key = format!(
            "{}-{}",
            escape_segment(&self.prefix),
            escape_segment(id.chain_id.as_str())
        );

        if let Some(account_name) = id.account_name.as_ref().filter(|name| !name.is_empty()) {
            key.push('-');
            key.push_str(&escape_segment(account_name.as_str()));
        }

        key
    }

    pub async fn persist<L: LinkSession>(
        &self,
        session: &Session<L>,
        id: &SessionId,
    ) -> Result<(), SessionStoreError> {
        let record = session
            .to_persisted()
            .map_err(|err| SessionStoreError::Link(Box::new(err)))?;
        let value = serde_json::to_string(&record)?;

        let key = self.key(id);
        self.storage
            .set(&key, value)
            .await
            .map_err(|err| SessionStoreError::Storage(Box::new(err)))?;

        debug!("persisted session {} under {key}", session.auth());

        Ok(())
    }

    /// Reads back the record stored for `id` and revives it through `link`.
    ///
    /// Any failure along the way (nothing stored, unreadable storage, malformed
    /// record, a link that refuses the blob, a record for another chain, a revived
    /// session whose identity differs from the record) means there is no session to
    /// restore, so this returns `None` rather than an error.
    pub async fn restore<L: WalletLink>(
        &self,
        link: &L,
        app_id: &str,
        id: &SessionId,
    ) -> Option<Session<L::Session>> {
        let key = self.key(id);

        let value = match self.storage.get(&key).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!("no persisted session under {key}");
                return None;
            }
            Err(err) => {
                warn!("unable to read persisted session {key}: {err}");
                return None;
            }
        };

        let record: PersistedSession = match serde_json::from_str(&value) {
            Ok(record) => record,
            Err(err) => {
                warn!("ignoring malformed persisted session {key}: {err}");
                return None;
            }
        };

        if record.chain_id != id.chain_id {
            warn!(
                "ignoring persisted session {key}: recorded for chain {}",
                record.chain_id
            );
            return None;
        }

        let session = match link.restore_session(app_id, record.link).await {
            Ok(link_session) => Session::new(link_session),
            Err(err) => {
                warn!("wallet link refused persisted session {key}: {err}");
                return None;
            }
        };

        if session.chain_id() != &record.chain_id
            || session.account_name() != &record.actor
            || session.permission() != &record.permission
        {
            warn!(
                "ignoring persisted session {key}: recorded for {}@{} on chain {}, revived as {} on chain {}",
                record.actor,
                record.permission,
                record.chain_id,
                session.auth(),
                session.chain_id()
            );
            return None;
        }

        debug!("restored session {} from {key}", session.auth());
        Some(session)
    }

    pub async fn remove(&self, id: &SessionId) -> Result<(), SessionStoreError> {
        self.storage
            .remove(&self.key(id))
            .await
            .map_err(|err| SessionStoreError::Storage(Box::new(err)))
    }
}
