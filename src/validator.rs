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

use crate::chain_query::{AccountPermissions, ChainQuery};
use crate::error::AnchorError;
use crate::session::Session;
use crate::wallet_link::{LinkSession, SignatureProvider};
use log::debug;

/// Every public key of every permission of `account`, in order, duplicates included.
pub fn extract_account_keys(account: &AccountPermissions) -> Vec<String> {
    account
        .permissions
        .iter()
        .flat_map(|permission| permission.required_auth.keys.iter())
        .map(|key_weight| key_weight.key.clone())
        .collect()
}

/// Checks that the keys a session can sign with actually control its account.
pub struct AccountValidator<'q, Q: ChainQuery, L: LinkSession> {
    chain_query: &'q Q,
    session: Session<L>,
}

impl<'q, Q: ChainQuery, L: LinkSession> AccountValidator<'q, Q, L> {
    pub fn new(chain_query: &'q Q, session: Session<L>) -> Self {
        Self {
            chain_query,
            session,
        }
    }

    /// Public keys the wallet makes available for the session's permission.
    pub async fn get_keys(&self) -> Result<Vec<String>, AnchorError> {
        self.session
            .signature_provider()
            .get_available_keys(self.session.permission())
            .await
            .map_err(|err| {
                AnchorError::data_request_caused_by(
                    format!(
                        "Unable to getKeys for account {}. Please make sure your wallet is running.",
                        self.session.account_name()
                    ),
                    err,
                )
            })
    }

    /// `true` when at least one key found on chain, under any permission of the
    /// account, is also offered by the wallet.
    pub async fn is_account_valid(&self) -> Result<bool, AnchorError> {
        let account_name = self.session.account_name();
        let failure_message = || format!("Account validation failed for account {account_name}.");

        let (account, session_keys) = futures::join!(
            self.chain_query.get_account(account_name),
            self.get_keys()
        );

        let account = account
            .map_err(|err| AnchorError::validation_caused_by(failure_message(), err))?;
        let session_keys = session_keys
            .map_err(|err| AnchorError::validation_caused_by(failure_message(), err))?;

        let account_keys = extract_account_keys(&account);
        let is_valid = account_keys.iter().any(|key| session_keys.contains(key));

        debug!(
            "account {account_name}: {} keys on chain, {} in wallet, valid: {is_valid}",
            account_keys.len(),
            session_keys.len()
        );

        Ok(is_valid)
    }
}
