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

use crate::chain_query::ChainQuery;
use crate::error::AnchorError;
use crate::options::{AuthenticatorOptions, LinkConfig, TransactOptions};
use crate::session::Session;
use crate::session_store::{SessionId, SessionStore};
use crate::signer::{SignedTransactionResult, TransactionSigner};
use crate::storage::Storage;
use crate::types::{Chain, Transaction};
use crate::validator::AccountValidator;
use crate::wallet_link::{LinkSession, WalletLink};
use log::{debug, info, warn};
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

const AUTHENTICATOR_NAME: &str = "anchor";
const ONBOARDING_LINK: &str = "https://github.com/greymass/anchor/";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initializing,
    Ready,
    LoggingIn,
    LoggingOut,
    Errored,
}

impl Phase {
    fn is_in_flight(self) -> bool {
        matches!(
            self,
            Phase::Initializing | Phase::LoggingIn | Phase::LoggingOut
        )
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Initializing => "initializing",
            Phase::Ready => "ready",
            Phase::LoggingIn => "logging in",
            Phase::LoggingOut => "logging out",
            Phase::Errored => "errored",
        };

        f.write_str(name)
    }
}

/// Snapshot of the authenticator, detached from it once returned.
pub struct AuthenticatorState<L: LinkSession> {
    pub loading: bool,
    pub error: Option<Arc<AnchorError>>,
    pub session: Option<Session<L>>,
}

impl<L: LinkSession> Clone for AuthenticatorState<L> {
    fn clone(&self) -> Self {
        Self {
            loading: self.loading,
            error: self.error.clone(),
            session: self.session.clone(),
        }
    }
}

impl<L: LinkSession> Debug for AuthenticatorState<L> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatorState")
            .field("loading", &self.loading)
            .field("error", &self.error)
            .field("session", &self.session)
            .finish()
    }
}

/// Secondary failures met while logging out. The session is gone either way.
#[derive(Debug, Default)]
pub struct LogoutReport {
    pub warnings: Vec<AnchorError>,
}

impl LogoutReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

struct ControllerState<L: LinkSession> {
    phase: Phase,
    error: Option<Arc<AnchorError>>,
    session: Option<Session<L>>,
}

fn read_state<L: LinkSession>(
    state: &RwLock<ControllerState<L>>,
) -> RwLockReadGuard<'_, ControllerState<L>> {
    state.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_state<L: LinkSession>(
    state: &RwLock<ControllerState<L>>,
) -> RwLockWriteGuard<'_, ControllerState<L>> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}

/// Settles the controller into `Ready` without a session when the future driving
/// `phase` is dropped before reaching its end.
struct InFlightGuard<'a, L: LinkSession> {
    state: &'a RwLock<ControllerState<L>>,
    phase: Phase,
}

impl<'a, L: LinkSession> InFlightGuard<'a, L> {
    fn new(state: &'a RwLock<ControllerState<L>>, phase: Phase) -> Self {
        Self { state, phase }
    }
}

impl<L: LinkSession> Drop for InFlightGuard<'_, L> {
    fn drop(&mut self) {
        let mut state = write_state(self.state);

        if state.phase == self.phase {
            debug!("{} abandoned, settling back to ready", self.phase);
            state.phase = Phase::Ready;
            state.session = None;
        }
    }
}

/// Drives the session lifecycle of one application against the Anchor wallet.
///
/// The authenticator owns at most one [`Session`], for the first configured chain.
/// `init`, `login`, `logout` and `reset` are serialized: `login` and `reset` refuse to
/// run while another of them is in flight, `logout` and `init` wait for their turn.
/// Every other operation works on a snapshot of the session taken when it starts, so
/// it is unaffected by a concurrent logout.
///
/// # Examples
///
/// ```rust,ignore
/// let authenticator = Authenticator::new(chains, options, link, chain_query, storage)?;
/// authenticator.init().await;
///
/// let session = authenticator.login().await?;
/// let signed = authenticator
///     .sign_transaction(&transaction, &TransactOptions::default())
///     .await?;
/// ```
pub struct Authenticator<Link, Query, Store>
where
    Link: WalletLink,
    Query: ChainQuery,
    Store: Storage,
{
    chains: Vec<Chain>,
    options: AuthenticatorOptions,
    link_config: LinkConfig,
    link: Link,
    chain_query: Query,
    session_store: SessionStore<Store>,
    state: RwLock<ControllerState<Link::Session>>,
    lifecycle: tokio::sync::Mutex<()>,
}

impl<Link, Query, Store> Authenticator<Link, Query, Store>
where
    Link: WalletLink,
    Query: ChainQuery,
    Store: Storage,
{
    pub fn new(
        chains: Vec<Chain>,
        options: AuthenticatorOptions,
        link: Link,
        chain_query: Query,
        storage: Store,
    ) -> Result<Self, AnchorError> {
        if options.app_name.is_empty() {
            return Err(AnchorError::initialization(
                "Anchor requires an app name to identify the application to the wallet",
            ));
        }

        let chain = chains
            .first()
            .ok_or_else(|| AnchorError::initialization("Anchor requires at least one chain"))?;

        let link_config = options.link_config(chain).ok_or_else(|| {
            AnchorError::initialization(format!(
                "Chain {} has no rpc endpoint",
                chain.chain_id
            ))
        })?;

        let session_store = SessionStore::new(storage, options.storage_prefix());

        Ok(Self {
            chains,
            options,
            link_config,
            link,
            chain_query,
            session_store,
            state: RwLock::new(ControllerState {
                phase: Phase::Uninitialized,
                error: None,
                session: None,
            }),
            lifecycle: tokio::sync::Mutex::new(()),
        })
    }

    fn session_id(&self) -> SessionId {
        SessionId::new(self.link_config.chain_id.clone())
    }

    fn active_session(&self) -> Result<Session<Link::Session>, AnchorError> {
        read_state(&self.state)
            .session
            .clone()
            .ok_or_else(|| AnchorError::invalid_state("No active session, log in first"))
    }

    /// Establishes the wallet link and restores the persisted session, if any.
    ///
    /// Never fails: a link that cannot be initialized leaves the authenticator
    /// [`Phase::Errored`] with the cause available from [`Authenticator::error`].
    pub async fn init(&self) {
        let _lifecycle = self.lifecycle.lock().await;

        {
            let mut state = write_state(&self.state);
            if state.session.is_some() {
                debug!("init: session already held, nothing to do");
                return;
            }
            state.phase = Phase::Initializing;
            state.error = None;
        }

        let _guard = InFlightGuard::new(&self.state, Phase::Initializing);

        if let Err(err) = self.link.init(&self.link_config).await {
            let error =
                AnchorError::initialization_caused_by("Unable to initialize the wallet link", err);
            warn!("{error}");

            let mut state = write_state(&self.state);
            state.phase = Phase::Errored;
            state.error = Some(Arc::new(error));
            return;
        }

        let restored = self
            .session_store
            .restore(&self.link, &self.options.app_name, &self.session_id())
            .await
            .filter(|session| {
                let matches_chain = session.chain_id() == &self.link_config.chain_id;
                if !matches_chain {
                    warn!(
                        "ignoring restored session {} for chain {}",
                        session.auth(),
                        session.chain_id()
                    );
                }
                matches_chain
            });

        match &restored {
            Some(session) => info!("restored session {}", session.auth()),
            None => debug!("init: no session to restore"),
        }

        let mut state = write_state(&self.state);
        state.phase = Phase::Ready;
        state.session = restored;
    }

    /// Asks the wallet for a session, unless one is already held.
    pub async fn login(&self) -> Result<Session<Link::Session>, AnchorError> {
        if self.chains.len() != 1 {
            return Err(AnchorError::unsupported(format!(
                "Anchor can only log in to a single chain, {} are configured",
                self.chains.len()
            )));
        }

        let _lifecycle = self.lifecycle.try_lock().map_err(|_| {
            AnchorError::invalid_state("Another login, logout or reset is in progress")
        })?;

        {
            let mut state = write_state(&self.state);

            if state.phase != Phase::Ready {
                return Err(AnchorError::invalid_state(format!(
                    "Cannot log in while the authenticator is {}",
                    state.phase
                )));
            }

            if let Some(session) = &state.session {
                debug!("login: reusing session {}", session.auth());
                return Ok(session.clone());
            }

            state.phase = Phase::LoggingIn;
            state.error = None;
        }

        let _guard = InFlightGuard::new(&self.state, Phase::LoggingIn);

        let link_session = match self.link.login(&self.options.app_name).await {
            Ok(link_session) => link_session,
            Err(err) => {
                let message = match err.to_string() {
                    message if message.is_empty() => "Login failed".to_string(),
                    message => message,
                };
                let error = AnchorError::login_caused_by(message.clone(), err);
                warn!("{error}");

                let mut state = write_state(&self.state);
                state.phase = Phase::Ready;
                state.error = Some(Arc::new(AnchorError::login(message)));
                return Err(error);
            }
        };

        let session = Session::new(link_session);

        if session.chain_id() != &self.link_config.chain_id {
            let message = format!(
                "Wallet returned a session for chain {}, expected {}",
                session.chain_id(),
                self.link_config.chain_id
            );
            warn!("{message}");

            let mut state = write_state(&self.state);
            state.phase = Phase::Errored;
            state.error = Some(Arc::new(AnchorError::login(message.clone())));
            return Err(AnchorError::login(message));
        }

        if let Err(err) = self
            .session_store
            .persist(&session, &self.session_id())
            .await
        {
            warn!("unable to persist session {}: {err}", session.auth());
        }

        info!("logged in as {}", session.auth());

        let mut state = write_state(&self.state);
        state.phase = Phase::Ready;
        state.session = Some(session.clone());

        Ok(session)
    }

    /// Drops the current session, then invalidates it on the wallet and in storage.
    ///
    /// Idempotent. Failures of the two cleanup steps are logged and returned in the
    /// report; the in-memory session is cleared regardless.
    pub async fn logout(&self) -> LogoutReport {
        let _lifecycle = self.lifecycle.lock().await;

        let session = {
            let mut state = write_state(&self.state);
            let session = state.session.take();
            if session.is_some() {
                state.phase = Phase::LoggingOut;
                state.error = None;
            }
            session
        };

        let mut report = LogoutReport::default();

        let Some(session) = session else {
            debug!("logout: no active session");
            return report;
        };

        let _guard = InFlightGuard::new(&self.state, Phase::LoggingOut);

        if let Err(err) = self
            .link
            .remove_session(&self.options.app_name, session.auth(), session.chain_id())
            .await
        {
            let error = AnchorError::logout_caused_by(
                format!("Unable to invalidate session {} on the wallet", session.auth()),
                err,
            );
            warn!("{error}");
            report.warnings.push(error);
        }

        if let Err(err) = self.session_store.remove(&self.session_id()).await {
            let error = AnchorError::logout_caused_by(
                format!("Unable to remove persisted session {}", session.auth()),
                err,
            );
            warn!("{error}");
            report.warnings.push(error);
        }

        info!("logged out {}", session.auth());

        write_state(&self.state).phase = Phase::Ready;

        report
    }

    /// Forgets the in-memory session and error. Storage and wallet are left untouched.
    pub fn reset(&self) -> Result<(), AnchorError> {
        let _lifecycle = self.lifecycle.try_lock().map_err(|_| {
            AnchorError::invalid_state("Cannot reset while a login, logout or init is in progress")
        })?;

        let mut state = write_state(&self.state);

        match state.phase {
            Phase::Ready | Phase::Errored => {
                state.phase = Phase::Ready;
                state.session = None;
                state.error = None;
                Ok(())
            }
            phase => Err(AnchorError::invalid_state(format!(
                "Cannot reset while the authenticator is {phase}"
            ))),
        }
    }

    pub fn state(&self) -> AuthenticatorState<Link::Session> {
        let state = read_state(&self.state);

        AuthenticatorState {
            loading: state.phase.is_in_flight(),
            error: state.error.clone(),
            session: state.session.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        read_state(&self.state).phase
    }

    pub fn session(&self) -> Option<Session<Link::Session>> {
        read_state(&self.state).session.clone()
    }

    pub fn is_loading(&self) -> bool {
        read_state(&self.state).phase.is_in_flight()
    }

    pub fn is_errored(&self) -> bool {
        read_state(&self.state).phase == Phase::Errored
    }

    pub fn error(&self) -> Option<Arc<AnchorError>> {
        read_state(&self.state).error.clone()
    }

    pub fn should_render(&self) -> bool {
        !self.is_loading()
    }

    pub fn should_auto_login(&self) -> bool {
        read_state(&self.state).session.is_some()
    }

    /// Anchor picks the account itself.
    pub fn should_request_account_name(&self) -> bool {
        false
    }

    pub fn requires_get_key_confirmation(&self) -> bool {
        false
    }

    pub fn name(&self) -> &'static str {
        AUTHENTICATOR_NAME
    }

    pub fn onboarding_link(&self) -> &'static str {
        ONBOARDING_LINK
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn options(&self) -> &AuthenticatorOptions {
        &self.options
    }

    pub fn session_store(&self) -> &SessionStore<Store> {
        &self.session_store
    }

    pub async fn sign_transaction(
        &self,
        transaction: &Transaction,
        options: &TransactOptions,
    ) -> Result<SignedTransactionResult, AnchorError> {
        TransactionSigner::new(self.active_session()?)
            .sign_transaction(transaction, options)
            .await
    }

    pub async fn sign_arbitrary(
        &self,
        public_key: &str,
        data: &str,
        help_text: &str,
    ) -> Result<String, AnchorError> {
        TransactionSigner::new(self.active_session()?)
            .sign_arbitrary(public_key, data, help_text)
            .await
    }

    pub async fn verify_key_ownership(&self, challenge: &str) -> Result<bool, AnchorError> {
        TransactionSigner::new(self.active_session()?)
            .verify_key_ownership(challenge)
            .await
    }

    pub async fn get_keys(&self) -> Result<Vec<String>, AnchorError> {
        AccountValidator::new(&self.chain_query, self.active_session()?)
            .get_keys()
            .await
    }

    pub async fn is_account_valid(&self) -> Result<bool, AnchorError> {
        AccountValidator::new(&self.chain_query, self.active_session()?)
            .is_account_valid()
            .await
    }
}

#[cfg(feature = "client")]
mod http_authenticator {
    use super::Authenticator;
    use crate::error::AnchorError;
    use crate::options::AuthenticatorOptions;
    use crate::reqwest::chain_client::ReqwestChainQuery;
    use crate::storage::Storage;
    use crate::types::Chain;
    use crate::wallet_link::WalletLink;

    /// [`Authenticator`] querying the chain over HTTP with `reqwest`.
    pub type HttpAuthenticator<Link, Store> = Authenticator<Link, ReqwestChainQuery, Store>;

    impl<Link: WalletLink, Store: Storage> HttpAuthenticator<Link, Store> {
        /// Builds the chain query from the first rpc endpoint of the first chain.
        pub fn with_http_chain_query(
            chains: Vec<Chain>,
            options: AuthenticatorOptions,
            link: Link,
            storage: Store,
        ) -> Result<Self, AnchorError> {
            let chain_query = chains
                .first()
                .and_then(ReqwestChainQuery::from_chain)
                .ok_or_else(|| {
                    AnchorError::initialization("Anchor requires a chain with an rpc endpoint")
                })?;

            Self::new(chains, options, link, chain_query, storage)
        }
    }
}

#[cfg(feature = "client")]
pub use http_authenticator::HttpAuthenticator;
