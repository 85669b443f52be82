//! BLAKE3 fingerprint of a plan snapshot.

use crate::core::types::Step;

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

/// Fingerprint a plan. Two plans share a digest iff they serialize identically,
/// so a step reorder or a changed param yields a new digest.
pub fn plan_digest(plan: &[Step]) -> Result<String, String> {
    let mut encoded = String::new();
    for step in plan {
        let line =
            serde_json::to_string(step).map_err(|e| format!("serialize {}: {}", step.id, e))?;
        encoded.push_str(&line);
        encoded.push('\n');
    }
    Ok(hash_string(&encoded))
}
