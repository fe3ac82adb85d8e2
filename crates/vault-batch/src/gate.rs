//! Cancellation gate.
//!
//! Decides whether a token may still mutate controller state. Exactly one token is current
//! (the last one minted); it is live until cancelled, failed, closed or superseded.

use crate::token::{OperationToken, TokenMinter};

#[derive(Debug, Default)]
pub(crate) struct CancellationGate {
    minter: TokenMinter,
    current: Option<OperationToken>,
    live: bool,
}

impl CancellationGate {
    /// Mints a new current token. Any previous token stops being live.
    pub fn open(&mut self) -> OperationToken {
        let token = self.minter.mint();
        self.current = Some(token);
        self.live = true;
        token
    }

    /// Invalidates the current token and returns it if it was live.
    pub fn invalidate(&mut self) -> Option<OperationToken> {
        if !self.live {
            return None;
        }
        self.live = false;
        self.current
    }

    /// Invalidates `token` only if it is still the live one.
    pub fn invalidate_if_current(&mut self, token: OperationToken) -> bool {
        if self.is_live(token) {
            self.live = false;
            true
        } else {
            false
        }
    }

    pub fn is_live(&self, token: OperationToken) -> bool {
        self.live && self.current == Some(token)
    }

    pub fn current(&self) -> Option<OperationToken> {
        self.current
    }

    /// The current token, if it is still live.
    pub fn live_token(&self) -> Option<OperationToken> {
        if self.live { self.current } else { None }
    }
}
