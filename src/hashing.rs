//! Hashing System - SHA-256 for Fingerprints and Manifests
//!
//! Every digest the engine emits is derived from SHA-256 so output names and
//! manifests are reproducible across machines.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

/// Length of the digest embedded in fingerprinted file names.
pub const FINGERPRINT_LEN: usize = 32;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Fingerprint digest for an asset: 32 hex chars over the relative path and
/// the built content.
///
/// Unbuilt assets pass an empty `content`, which makes the digest a pure
/// function of the relative path until the first build.
pub fn fingerprint(relative_path: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(relative_path.as_bytes());
    hasher.update([0u8]);
    hasher.update(content.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(FINGERPRINT_LEN);
    digest
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Compute manifest hash over the canonical JSON form
pub fn compute_manifest_hash<T: Serialize>(manifest: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(manifest)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": 3});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_fingerprint_length_and_alphabet() {
        let digest = fingerprint("foo/bar.sass", "");
        assert_eq!(digest.len(), FINGERPRINT_LEN);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let unbuilt = fingerprint("foo/bar.sass", "");
        let built = fingerprint("foo/bar.sass", "body {}");
        assert_ne!(unbuilt, built);
        assert_eq!(built, fingerprint("foo/bar.sass", "body {}"));
    }

    #[test]
    fn test_fingerprint_separates_path_from_content() {
        // "ab" + "c" must not collide with "a" + "bc"
        assert_ne!(fingerprint("ab", "c"), fingerprint("a", "bc"));
    }

    #[test]
    fn test_manifest_hash_stable() {
        let manifest = json!({
            "environment": "production",
            "assets": ["foo/bar.css"]
        });
        let h1 = compute_manifest_hash(&manifest).unwrap();
        let h2 = compute_manifest_hash(&manifest).unwrap();
        assert_eq!(h1, h2);
    }
}
