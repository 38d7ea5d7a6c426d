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

use anchor_session::chain_query::{
    AccountPermissions, Authority, ChainQuery, KeyWeight, Permission,
};
use anchor_session::options::{LinkConfig, TransactOptions};
use anchor_session::storage::{MemoryStorage, Storage};
use anchor_session::types::{ChainId, Name, PermissionLevel, Transaction};
use anchor_session::wallet_link::{LinkSession, SignatureProvider, WalletLink};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::Notify;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct MockError(pub String);

/// Knobs and counters shared by the mock link, its sessions and their providers.
pub struct MockLinkState {
    pub chain_id: Mutex<ChainId>,
    pub auth: Mutex<PermissionLevel>,

    pub fail_init: AtomicBool,
    pub fail_login: AtomicBool,
    pub fail_restore: AtomicBool,
    pub fail_remove_session: AtomicBool,
    pub fail_transact: AtomicBool,
    pub fail_get_keys: AtomicBool,

    /// When set, `init` signals `init_entered` then waits for `init_release`.
    pub hold_init: AtomicBool,
    pub init_entered: Notify,
    pub init_release: Notify,

    /// When set, `login` signals `login_entered` then waits for `login_release`.
    pub hold_login: AtomicBool,
    pub login_entered: Notify,
    pub login_release: Notify,

    pub init_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub restore_calls: AtomicUsize,
    pub remove_session_calls: AtomicUsize,
    pub transact_calls: AtomicUsize,

    pub transact_response: Mutex<Value>,
    pub available_keys: Mutex<Vec<String>>,
    pub last_config: Mutex<Option<LinkConfig>>,
}

impl MockLinkState {
    pub fn new(chain_id: &str) -> Self {
        Self {
            chain_id: Mutex::new(ChainId::from(chain_id)),
            auth: Mutex::new(PermissionLevel::new("alice", "active")),
            fail_init: AtomicBool::new(false),
            fail_login: AtomicBool::new(false),
            fail_restore: AtomicBool::new(false),
            fail_remove_session: AtomicBool::new(false),
            fail_transact: AtomicBool::new(false),
            fail_get_keys: AtomicBool::new(false),
            hold_init: AtomicBool::new(false),
            init_entered: Notify::new(),
            init_release: Notify::new(),
            hold_login: AtomicBool::new(false),
            login_entered: Notify::new(),
            login_release: Notify::new(),
            init_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            restore_calls: AtomicUsize::new(0),
            remove_session_calls: AtomicUsize::new(0),
            transact_calls: AtomicUsize::new(0),
            transact_response: Mutex::new(Value::Null),
            available_keys: Mutex::new(vec![]),
            last_config: Mutex::new(None),
        }
    }

    pub fn set(&self, flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    pub fn count(&self, counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn set_transact_response(&self, response: Value) {
        *self.transact_response.lock().unwrap() = response;
    }

    pub fn set_available_keys(&self, keys: &[&str]) {
        *self.available_keys.lock().unwrap() = keys.iter().map(|key| key.to_string()).collect();
    }

    pub fn set_chain_id(&self, chain_id: &str) {
        *self.chain_id.lock().unwrap() = ChainId::from(chain_id);
    }
}

fn fail_if(flag: &AtomicBool, message: &str) -> Result<(), MockError> {
    if flag.load(Ordering::SeqCst) {
        return Err(MockError(message.to_string()));
    }

    Ok(())
}

#[derive(Clone)]
pub struct MockWalletLink {
    pub state: Arc<MockLinkState>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MockSessionData {
    chain_id: ChainId,
    actor: Name,
    permission: Name,
}

#[async_trait]
impl WalletLink for MockWalletLink {
    type Error = MockError;
    type Session = MockLinkSession;

    async fn init(&self, config: &LinkConfig) -> Result<(), Self::Error> {
        self.state.init_calls.fetch_add(1, Ordering::SeqCst);

        if self.state.hold_init.load(Ordering::SeqCst) {
            self.state.init_entered.notify_one();
            self.state.init_release.notified().await;
        }

        fail_if(&self.state.fail_init, "Unable to reach the callback service")?;

        *self.state.last_config.lock().unwrap() = Some(config.clone());
        Ok(())
    }

    async fn login(&self, _app_id: &str) -> Result<Self::Session, Self::Error> {
        self.state.login_calls.fetch_add(1, Ordering::SeqCst);

        if self.state.hold_login.load(Ordering::SeqCst) {
            self.state.login_entered.notify_one();
            self.state.login_release.notified().await;
        }

        fail_if(&self.state.fail_login, "User canceled request")?;

        Ok(MockLinkSession {
            chain_id: self.state.chain_id.lock().unwrap().clone(),
            auth: self.state.auth.lock().unwrap().clone(),
            state: Arc::clone(&self.state),
        })
    }

    async fn restore_session(
        &self,
        _app_id: &str,
        data: Value,
    ) -> Result<Self::Session, Self::Error> {
        self.state.restore_calls.fetch_add(1, Ordering::SeqCst);
        fail_if(&self.state.fail_restore, "Unable to restore session")?;

        let data: MockSessionData =
            serde_json::from_value(data).map_err(|err| MockError(err.to_string()))?;

        Ok(MockLinkSession {
            chain_id: data.chain_id,
            auth: PermissionLevel::new(data.actor, data.permission),
            state: Arc::clone(&self.state),
        })
    }

    async fn remove_session(
        &self,
        _app_id: &str,
        _auth: &PermissionLevel,
        _chain_id: &ChainId,
    ) -> Result<(), Self::Error> {
        self.state.remove_session_calls.fetch_add(1, Ordering::SeqCst);
        fail_if(&self.state.fail_remove_session, "Wallet unreachable")
    }
}

pub struct MockLinkSession {
    chain_id: ChainId,
    auth: PermissionLevel,
    state: Arc<MockLinkState>,
}

#[async_trait]
impl LinkSession for MockLinkSession {
    type Error = MockError;
    type SignatureProvider = MockSignatureProvider;

    fn chain_id(&self) -> ChainId {
        self.chain_id.clone()
    }

    fn auth(&self) -> PermissionLevel {
        self.auth.clone()
    }

    async fn transact(
        &self,
        _transaction: &Transaction,
        _options: &TransactOptions,
    ) -> Result<Value, Self::Error> {
        self.state.transact_calls.fetch_add(1, Ordering::SeqCst);
        fail_if(&self.state.fail_transact, "User canceled request")?;

        Ok(self.state.transact_response.lock().unwrap().clone())
    }

    fn make_signature_provider(&self) -> Self::SignatureProvider {
        MockSignatureProvider {
            state: Arc::clone(&self.state),
        }
    }

    fn serialize(&self) -> Result<Value, Self::Error> {
        Ok(json!(MockSessionData {
            chain_id: self.chain_id.clone(),
            actor: self.auth.actor.clone(),
            permission: self.auth.permission.clone(),
        }))
    }
}

pub struct MockSignatureProvider {
    state: Arc<MockLinkState>,
}

#[async_trait]
impl SignatureProvider for MockSignatureProvider {
    type Error = MockError;

    async fn get_available_keys(&self, _permission: &Name) -> Result<Vec<String>, Self::Error> {
        fail_if(&self.state.fail_get_keys, "Wallet is not running")?;

        Ok(self.state.available_keys.lock().unwrap().clone())
    }
}

/// Answers `get_account` with the configured permissions, or fails when there are none.
#[derive(Clone, Default)]
pub struct MockChainQuery {
    pub account: Arc<Mutex<Option<AccountPermissions>>>,
    pub calls: Arc<AtomicUsize>,
}

impl MockChainQuery {
    pub fn set_account_keys(&self, account_name: &str, keys: &[&str]) {
        let permission = Permission {
            perm_name: Name::from("active"),
            parent: Some(Name::from("owner")),
            required_auth: Authority {
                threshold: 1,
                keys: keys
                    .iter()
                    .map(|key| KeyWeight {
                        key: key.to_string(),
                        weight: 1,
                    })
                    .collect(),
                ..Default::default()
            },
        };

        *self.account.lock().unwrap() = Some(AccountPermissions {
            account_name: Some(Name::from(account_name)),
            permissions: vec![permission],
        });
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainQuery for MockChainQuery {
    type Error = MockError;

    async fn get_account(&self, account_name: &Name) -> Result<AccountPermissions, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        self.account
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| MockError(format!("unknown key (eosio::chain::name): ({account_name})")))
    }
}

/// [`MemoryStorage`] whose writes and removals can be made to fail.
#[derive(Clone, Default)]
pub struct MockStorage {
    pub inner: MemoryStorage,
    pub fail_set: Arc<AtomicBool>,
    pub fail_remove: Arc<AtomicBool>,
}

#[async_trait]
impl Storage for MockStorage {
    type Error = MockError;

    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.inner.get(key).await.unwrap_or_default())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), Self::Error> {
        fail_if(&self.fail_set, "Quota exceeded")?;
        self.inner
            .set(key, value)
            .await
            .map_err(|err| MockError(err.to_string()))
    }

    async fn remove(&self, key: &str) -> Result<(), Self::Error> {
        fail_if(&self.fail_remove, "Storage is read-only")?;
        self.inner
            .remove(key)
            .await
            .map_err(|err| MockError(err.to_string()))
    }
}
