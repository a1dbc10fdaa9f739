use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use webauthn_rp_types::PublicKeyCredentialSource;

/// Failure reported by a [`CredentialSourceRepository`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("credential repository failure: {0}")]
pub struct RepositoryError(pub String);

/// Storage of registered credentials, owned by the relying party.
///
/// Registration reads it to reject duplicate credential IDs and writes the new credential once
/// every check passed. Authentication only reads it, the counter update it returns is applied by
/// the caller.
#[cfg_attr(any(test, feature = "testable"), mockall::automock)]
pub trait CredentialSourceRepository {
    /// The credential registered under `credential_id`, if any.
    fn find_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<PublicKeyCredentialSource>, RepositoryError>;

    /// Store a credential, replacing any credential with the same ID.
    fn save(&mut self, source: PublicKeyCredentialSource) -> Result<(), RepositoryError>;
}

/// In-memory credentials keyed by credential ID
///
/// Useful for tests.
pub type MemoryRepository = HashMap<Vec<u8>, PublicKeyCredentialSource>;

impl CredentialSourceRepository for MemoryRepository {
    fn find_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<PublicKeyCredentialSource>, RepositoryError> {
        Ok(self.get(credential_id).cloned())
    }

    fn save(&mut self, source: PublicKeyCredentialSource) -> Result<(), RepositoryError> {
        self.insert(source.credential_id.to_vec(), source);
        Ok(())
    }
}

/// A single credential, for relying parties that already loaded the user's credential.
impl CredentialSourceRepository for Option<PublicKeyCredentialSource> {
    fn find_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<PublicKeyCredentialSource>, RepositoryError> {
        Ok(self
            .clone()
            .filter(|source| source.credential_id.as_slice() == credential_id))
    }

    fn save(&mut self, source: PublicKeyCredentialSource) -> Result<(), RepositoryError> {
        self.replace(source);
        Ok(())
    }
}

impl<R: CredentialSourceRepository> CredentialSourceRepository for Arc<Mutex<R>> {
    fn find_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> Result<Option<PublicKeyCredentialSource>, RepositoryError> {
        self.lock()
            .map_err(|e| RepositoryError(e.to_string()))?
            .find_by_credential_id(credential_id)
    }

    fn save(&mut self, source: PublicKeyCredentialSource) -> Result<(), RepositoryError> {
        self.lock()
            .map_err(|e| RepositoryError(e.to_string()))?
            .save(source)
    }
}
