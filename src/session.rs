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

use crate::session_store::PersistedSession;
use crate::types::{ChainId, Name, PermissionLevel};
use crate::wallet_link::LinkSession;
use chrono::Utc;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A delegated signing grant for one actor/permission on one chain.
///
/// A `Session` never changes after construction; logging in again produces a new
/// one. Clones share the underlying link session and signature provider, which is
/// what lets concurrent operations keep using a session the authenticator has
/// already dropped.
pub struct Session<L: LinkSession> {
    chain_id: ChainId,
    auth: PermissionLevel,
    link_session: Arc<L>,
    signature_provider: Arc<L::SignatureProvider>,
}

impl<L: LinkSession> Session<L> {
    pub fn new(link_session: L) -> Self {
        let signature_provider = link_session.make_signature_provider();

        Session {
            chain_id: link_session.chain_id(),
            auth: link_session.auth(),
            link_session: Arc::new(link_session),
            signature_provider: Arc::new(signature_provider),
        }
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn account_name(&self) -> &Name {
        &self.auth.actor
    }

    pub fn permission(&self) -> &Name {
        &self.auth.permission
    }

    pub fn auth(&self) -> &PermissionLevel {
        &self.auth
    }

    pub fn link_session(&self) -> &L {
        &self.link_session
    }

    pub fn signature_provider(&self) -> &L::SignatureProvider {
        &self.signature_provider
    }

    pub fn to_persisted(&self) -> Result<PersistedSession, L::Error> {
        Ok(PersistedSession {
            chain_id: self.chain_id.clone(),
            actor: self.auth.actor.clone(),
            permission: self.auth.permission.clone(),
            link: self.link_session.serialize()?,
            created_at: u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default(),
        })
    }
}

impl<L: LinkSession> Clone for Session<L> {
    fn clone(&self) -> Self {
        Session {
            chain_id: self.chain_id.clone(),
            auth: self.auth.clone(),
            link_session: Arc::clone(&self.link_session),
            signature_provider: Arc::clone(&self.signature_provider),
        }
    }
}

impl<L: LinkSession> PartialEq for Session<L> {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id && self.auth == other.auth
    }
}

impl<L: LinkSession> Eq for Session<L> {}

impl<L: LinkSession> Debug for Session<L> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("chain_id", &self.chain_id)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}
