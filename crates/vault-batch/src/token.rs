//! Operation tokens.
//!
//! Every launched batch gets a fresh token. Tokens only grow, so an event carrying an older
//! token can always be told apart from the current operation's events.

use serde::{Deserialize, Serialize};

/// Identifier of one launched batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationToken(u64);

impl OperationToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for OperationToken {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for OperationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// Mints strictly increasing tokens, starting at 1.
#[derive(Debug, Default)]
pub(crate) struct TokenMinter {
    last: u64,
}

impl TokenMinter {
    pub fn mint(&mut self) -> OperationToken {
        self.last += 1;
        OperationToken(self.last)
    }
}
