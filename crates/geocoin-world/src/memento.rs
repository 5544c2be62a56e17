//! Versioned memento codec for cache state.
//!
//! A memento is the JSON encoding of a cache's mutable fields:
//!
//! ```text
//! {"version":1,"value":34,"tokens":[{"origin":"10:20","serial":0}, ...]}
//! ```
//!
//! Decoding is strict. Unknown or missing fields, a version other than
//! [`MEMENTO_VERSION`], a `value` that disagrees with the token count, a
//! malformed origin tag, or a repeated token identity all fail with
//! [`WorldError::Deserialization`]. A decoded memento can therefore never
//! produce a cache whose value and contents disagree.

use std::collections::BTreeSet;

use geocoin_types::{CellAddress, Memento, Token};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Current memento schema version.
pub const MEMENTO_VERSION: u32 = 1;

#[derive(Serialize)]
struct CacheRecordRef<'a> {
    version: u32,
    value: u32,
    tokens: &'a [Token],
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheRecord {
    version: u32,
    value: u32,
    tokens: Vec<Token>,
}

/// Encode a token collection as a memento.
///
/// # Errors
///
/// Returns [`WorldError::ArithmeticOverflow`] if the token count does not fit
/// in a `u32`, or [`WorldError::Serialization`] if JSON encoding fails.
pub fn encode(tokens: &[Token]) -> Result<Memento, WorldError> {
    let value = u32::try_from(tokens.len()).map_err(|_| WorldError::ArithmeticOverflow)?;
    let record = CacheRecordRef {
        version: MEMENTO_VERSION,
        value,
        tokens,
    };
    Ok(Memento::new(serde_json::to_string(&record)?))
}

/// Decode and validate a memento, returning its tokens in stored order.
///
/// # Errors
///
/// Returns [`WorldError::Deserialization`] for any shape or invariant
/// violation described in the module docs.
pub fn decode(memento: &Memento) -> Result<Vec<Token>, WorldError> {
    let record: CacheRecord = serde_json::from_str(memento.as_str())
        .map_err(|e| WorldError::malformed(e.to_string()))?;

    if record.version != MEMENTO_VERSION {
        return Err(WorldError::malformed(format!(
            "unsupported version {}",
            record.version
        )));
    }

    let count = u32::try_from(record.tokens.len()).map_err(|_| WorldError::ArithmeticOverflow)?;
    if record.value != count {
        return Err(WorldError::malformed(format!(
            "value {} does not match {count} stored tokens",
            record.value
        )));
    }

    check_token_identities(&record.tokens)?;
    Ok(record.tokens)
}

/// Check that every token has a well-formed origin and no identity repeats.
///
/// # Errors
///
/// Returns [`WorldError::Deserialization`] naming the first offending token.
pub fn check_token_identities(tokens: &[Token]) -> Result<(), WorldError> {
    let mut seen = BTreeSet::new();
    for token in tokens {
        if token.origin.parse::<CellAddress>().is_err() {
            return Err(WorldError::malformed(format!(
                "token {token} has a malformed origin"
            )));
        }
        if !seen.insert((token.origin.as_str(), token.serial)) {
            return Err(WorldError::malformed(format!("token {token} appears twice")));
        }
    }
    Ok(())
}
