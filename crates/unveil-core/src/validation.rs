//! Input validation for mint and reveal requests.

use std::collections::BTreeMap;

use crate::canonical::check_pair_lengths;
use crate::error::{CoreError, Result};

/// Build the attribute map from parallel key/value arrays.
///
/// Fails on unequal lengths or on a key that appears twice. The commitment
/// hashes the arrays as given, so duplicates are rejected only when turning
/// them into a map.
pub fn build_attributes<K, V>(keys: &[K], values: &[V]) -> Result<BTreeMap<String, String>>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    check_pair_lengths(keys.len(), values.len())?;

    let mut attributes = BTreeMap::new();
    for (key, value) in keys.iter().zip(values) {
        let key = key.as_ref();
        if attributes
            .insert(key.to_string(), value.as_ref().to_string())
            .is_some()
        {
            return Err(CoreError::DuplicateAttributeKey(key.to_string()));
        }
    }
    Ok(attributes)
}

/// Check the parallel arrays of a bulk mint.
pub fn check_bulk_lengths(names: usize, descriptions: usize, commitments: usize) -> Result<()> {
    if names != descriptions || names != commitments {
        return Err(CoreError::InvalidLength(format!(
            "bulk mint got {} names, {} descriptions, {} commitments",
            names, descriptions, commitments
        )));
    }
    Ok(())
}

/// Check that a bulk mint is within the configured batch limit.
pub fn check_bulk_limit(len: usize, max: usize) -> Result<()> {
    if len > max {
        return Err(CoreError::InvalidLength(format!(
            "bulk mint of {} exceeds limit of {}",
            len, max
        )));
    }
    Ok(())
}
