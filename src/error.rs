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

use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Boxed collaborator error kept as the `source` of an [`AnchorError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The kind of an [`AnchorError`], for callers that only need to branch on the category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Initialization,
    Unsupported,
    Login,
    Signing,
    DataRequest,
    Validation,
    Logout,
    InvalidState,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Initialization => "initialization",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Login => "login",
            ErrorKind::Signing => "signing",
            ErrorKind::DataRequest => "data request",
            ErrorKind::Validation => "validation",
            ErrorKind::Logout => "logout",
            ErrorKind::InvalidState => "invalid state",
        };

        f.write_str(name)
    }
}

/// Every error crossing the public boundary of the crate.
///
/// Collaborator failures (wallet link, chain query, storage) are never returned as-is:
/// they are wrapped into exactly one variant and kept reachable through
/// [`std::error::Error::source`].
#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("Initialization error: {message}")]
    Initialization {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("Unsupported: {message}")]
    Unsupported { message: String },

    #[error("Login error: {message}")]
    Login {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("Signing error: {message}")]
    Signing {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("Data request error: {message}")]
    DataRequest {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("Logout error: {message}")]
    Logout {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },
}

impl AnchorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnchorError::Initialization { .. } => ErrorKind::Initialization,
            AnchorError::Unsupported { .. } => ErrorKind::Unsupported,
            AnchorError::Login { .. } => ErrorKind::Login,
            AnchorError::Signing { .. } => ErrorKind::Signing,
            AnchorError::DataRequest { .. } => ErrorKind::DataRequest,
            AnchorError::Validation { .. } => ErrorKind::Validation,
            AnchorError::Logout { .. } => ErrorKind::Logout,
            AnchorError::InvalidState { .. } => ErrorKind::InvalidState,
        }
    }

    pub(crate) fn initialization(message: impl Into<String>) -> Self {
        AnchorError::Initialization {
            message: message.into(),
            cause: None,
        }
    }

    pub(crate) fn initialization_caused_by<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        AnchorError::Initialization {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub(crate) fn login(message: impl Into<String>) -> Self {
        AnchorError::Login {
            message: message.into(),
            cause: None,
        }
    }

    pub(crate) fn login_caused_by<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        AnchorError::Login {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub(crate) fn data_request_caused_by<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        AnchorError::DataRequest {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub(crate) fn validation_caused_by<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        AnchorError::Validation {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub(crate) fn logout_caused_by<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        AnchorError::Logout {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        AnchorError::Unsupported {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        AnchorError::InvalidState {
            message: message.into(),
        }
    }

    pub(crate) fn signing(message: impl Into<String>) -> Self {
        AnchorError::Signing {
            message: message.into(),
            cause: None,
        }
    }

    pub(crate) fn signing_caused_by<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        AnchorError::Signing {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Storage error: {0}")]
    Storage(#[source] BoxError),

    #[error("JSON serialization error: {0}")]
    JSONSerialization(#[from] serde_json::Error),

    #[error("Wallet link error: {0}")]
    Link(#[source] BoxError),
}

#[derive(Debug, Error, PartialEq)]
pub enum PackError {
    #[error("Invalid name {name}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Missing transaction header field: {field_name}")]
    MissingHeaderField { field_name: String },

    #[error("Invalid expiration {expiration}, expected %Y-%m-%dT%H:%M:%S")]
    InvalidExpiration { expiration: String },

    #[error("Action {account}::{name} carries unpacked data, only hex encoded data can be packed")]
    UnpackedActionData { account: String, name: String },

    #[error("HEX deserialization error: {0}")]
    HEXDeserialization(#[from] hex::FromHexError),
}

#[derive(Debug, Error)]
pub enum ChainQueryError {
    #[error("HTTP error: {0}")]
    Http(#[source] BoxError),

    #[error("Error while fetching account from {url}: HTTP {status} - {response}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        response: String,
    },

    #[error("Chain API error {code} ({name}): {message}")]
    Api {
        code: i64,
        name: String,
        message: String,
    },

    #[error("JSON serialization error: {0}")]
    JSONSerialization(#[from] serde_json::Error),
}

#[cfg(feature = "client")]
#[derive(Debug, Error)]
pub enum ReqwestError {
    #[error("A reqwest error occurred: {0}")]
    Reqwest(#[from] ::reqwest::Error),
    #[error("Unable to convert http headers: InvalidHeaderValue")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
    #[error("Unable to convert http headers: InvalidHeaderName")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),
}
