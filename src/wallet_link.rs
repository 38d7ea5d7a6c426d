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

use crate::options::{LinkConfig, TransactOptions};
use crate::types::{ChainId, Name, PermissionLevel, Transaction};
use async_trait::async_trait;

/// Abstraction over the wallet-link transport (anchor-link and friends).
///
/// The transport itself, how the request reaches the wallet (QR code, push, deep
/// link) and how long it waits for the user, lives entirely behind this trait. The
/// [`Authenticator`](crate::authenticator::Authenticator) only relies on the
/// outcome of each call.
#[async_trait]
pub trait WalletLink: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;
    type Session: LinkSession;

    /// Establishes the link. Called once by `Authenticator::init`.
    async fn init(&self, _config: &LinkConfig) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Asks the wallet for a new session. Suspends until the user approves, rejects,
    /// or the transport gives up.
    async fn login(&self, app_id: &str) -> Result<Self::Session, Self::Error>;

    /// Revives a session from the blob produced by [`LinkSession::serialize`].
    async fn restore_session(
        &self,
        app_id: &str,
        data: serde_json::Value,
    ) -> Result<Self::Session, Self::Error>;

    /// Best-effort invalidation of a session on the wallet side.
    async fn remove_session(
        &self,
        app_id: &str,
        auth: &PermissionLevel,
        chain_id: &ChainId,
    ) -> Result<(), Self::Error>;
}

/// A live session handed out by a [`WalletLink`].
///
/// `transact` returns the signer's raw answer; its shape depends on the link version
/// and is normalized by [`TransactionSigner`](crate::signer::TransactionSigner).
#[async_trait]
pub trait LinkSession: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;
    type SignatureProvider: SignatureProvider;

    fn chain_id(&self) -> ChainId;

    fn auth(&self) -> PermissionLevel;

    async fn transact(
        &self,
        transaction: &Transaction,
        options: &TransactOptions,
    ) -> Result<serde_json::Value, Self::Error>;

    fn make_signature_provider(&self) -> Self::SignatureProvider;

    /// Opaque, link-specific representation used to persist the session.
    fn serialize(&self) -> Result<serde_json::Value, Self::Error>;
}

#[async_trait]
pub trait SignatureProvider: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn get_available_keys(&self, permission: &Name) -> Result<Vec<String>, Self::Error>;
}
