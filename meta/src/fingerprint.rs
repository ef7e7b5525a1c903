use ccpp_schema_core::CcppMetadata;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// SHA-256 hex digest of the canonical JSON encoding of `metadata`.
///
/// Two loads of the same directory produce the same fingerprint.
pub fn fingerprint(metadata: &CcppMetadata) -> Result<String> {
    let bytes = serde_json::to_vec(metadata)?;
    let hash = Sha256::digest(&bytes);
    Ok(format!("{:x}", hash))
}
