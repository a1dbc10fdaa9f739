//! Token binding handling.
//!
//! Clients report in the client data whether the TLS connection to the relying party was token
//! bound, and with which ID. How much of that a relying party checks depends on whether its TLS
//! terminator supports token binding at all.
//!
//! <https://w3c.github.io/webauthn/#dom-collectedclientdata-tokenbinding>

use webauthn_rp_types::{
    encoding::try_from_base64url,
    webauthn::{TokenBinding, TokenBindingStatus},
};

use crate::{CeremonyError, RequestContext};

/// Checks the token binding a client reports against the request it arrived on.
#[cfg_attr(any(test, feature = "testable"), mockall::automock)]
pub trait TokenBindingHandler {
    /// Accept or reject the client's `tokenBinding` member.
    fn check<'a>(
        &self,
        token_binding: Option<&'a TokenBinding>,
        request: &RequestContext,
    ) -> Result<(), CeremonyError>;
}

/// Accepts whatever the client reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreTokenBindingHandler;

impl TokenBindingHandler for IgnoreTokenBindingHandler {
    fn check(
        &self,
        _token_binding: Option<&TokenBinding>,
        _request: &RequestContext,
    ) -> Result<(), CeremonyError> {
        Ok(())
    }
}

/// For relying parties whose TLS stack cannot token bind: a client claiming a bound connection
/// is talking to someone else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenBindingNotSupportedHandler;

impl TokenBindingHandler for TokenBindingNotSupportedHandler {
    fn check(
        &self,
        token_binding: Option<&TokenBinding>,
        _request: &RequestContext,
    ) -> Result<(), CeremonyError> {
        match token_binding {
            Some(TokenBinding {
                status: TokenBindingStatus::Present,
                ..
            }) => {
                log::warn!("client reports a token binding this relying party cannot provide");
                Err(CeremonyError::TokenBindingMismatch)
            }
            _ => Ok(()),
        }
    }
}

/// Compares a present token binding ID with the `Sec-Token-Binding` header of the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecTokenBindingHandler;

impl TokenBindingHandler for SecTokenBindingHandler {
    fn check(
        &self,
        token_binding: Option<&TokenBinding>,
        request: &RequestContext,
    ) -> Result<(), CeremonyError> {
        let Some(TokenBinding {
            status: TokenBindingStatus::Present,
            id,
        }) = token_binding
        else {
            return Ok(());
        };

        let client_id = id.as_deref().and_then(try_from_base64url);
        let connection_id = request
            .sec_token_binding
            .as_deref()
            .and_then(try_from_base64url);
        match (client_id, connection_id) {
            (Some(client), Some(connection)) if client == connection => Ok(()),
            _ => {
                log::warn!("token binding ID does not match the Sec-Token-Binding header");
                Err(CeremonyError::TokenBindingMismatch)
            }
        }
    }
}

/// Fails unless the client reports a bound connection, for RP IDs configured to require one.
pub(crate) fn require_present(token_binding: Option<&TokenBinding>) -> Result<(), CeremonyError> {
    match token_binding {
        Some(TokenBinding {
            status: TokenBindingStatus::Present,
            id: Some(_),
        }) => Ok(()),
        _ => Err(CeremonyError::TokenBindingMismatch),
    }
}
