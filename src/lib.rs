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

//! Session adapter for the Anchor wallet.
//!
//! The crate keeps at most one delegated signing session obtained through an
//! anchor-link style [`WalletLink`](wallet_link::WalletLink), persists it through a
//! pluggable [`Storage`](storage::Storage), and exposes transaction signing and
//! account validation against it. See [`Authenticator`](authenticator::Authenticator)
//! for the entry point.

pub mod authenticator;
pub mod chain_query;
pub mod error;
pub mod http_client;
pub mod options;
pub mod packing;
pub mod session;
pub mod session_store;
pub mod signer;
pub mod storage;
pub mod types;
pub mod validator;
pub mod wallet_link;

#[cfg(feature = "client")]
pub mod reqwest;
