//! Content hash over the canonical serialization.

use sha2::{Digest, Sha256};
use std::fmt;

use super::canonical::CanonicalWorkflow;

/// A hex-encoded SHA-256 digest over the canonical form's stable
/// serialization, suitable for caller-side content addressing / caching.
///
/// `serde_json`'s `Value::Object` (built here without the `preserve_order`
/// feature) sorts keys alphabetically, which is exactly the "mapping keys
/// ... alphabetically sorted for stable hashing" rule from spec.md §3 — the
/// direct `Serialize` impl on [`CanonicalWorkflow`] (used for the wire body)
/// keeps declared/insertion order instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn compute(canonical: &CanonicalWorkflow) -> Self {
        let value = serde_json::to_value(canonical).expect("canonical workflow always serializes");
        let stable_bytes =
            serde_json::to_vec(&value).expect("serde_json::Value always serializes");
        let digest = Sha256::digest(&stable_bytes);
        ContentHash(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::WorkflowBuilder;
    use crate::compiler::Compiler;
    use crate::model::Executor;

    #[test]
    fn compile_is_deterministic() {
        let build = || {
            WorkflowBuilder::new("demo")
                .step(
                    "a",
                    Executor::Shell {
                        command: "echo 1".into(),
                    },
                )
                .build()
                .unwrap()
        };
        let (c1, h1) = Compiler::compile(&build()).unwrap();
        let (c2, h2) = Compiler::compile(&build()).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(
            serde_json::to_string(&c1).unwrap(),
            serde_json::to_string(&c2).unwrap()
        );
    }
}
