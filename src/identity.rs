//! Stable accessory identities.
//!
//! A device's identity token is content-addressed on its configured `id` and
//! nothing else, so renaming a fan, moving it to another address or
//! re-recording its codes keeps the accessory the host already knows about.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token matching a configured device against accessories cached by the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct IdentityToken(Uuid);

/// Derives an identity token from a device id. Implementations must be pure:
/// the same id always yields the same token, across restarts and releases.
pub trait IdentityProvider: Send + Sync {
    fn derive(&self, id: &str) -> IdentityToken;
}

/// Name-based (version 5) UUIDs under a fixed namespace.
#[derive(Clone, Copy, Debug)]
pub struct NamespacedUuid {
    namespace: Uuid,
}

impl NamespacedUuid {
    /// Must never change once accessories have been registered with a host.
    pub const NAMESPACE: Uuid = Uuid::from_u128(0x5f0c_1a3e_9b27_4d61_8e4a_2c7d_b1f0_6a93);

    pub const fn new(namespace: Uuid) -> Self {
        Self { namespace }
    }
}

impl Default for NamespacedUuid {
    fn default() -> Self {
        Self::new(Self::NAMESPACE)
    }
}

impl IdentityProvider for NamespacedUuid {
    fn derive(&self, id: &str) -> IdentityToken {
        IdentityToken(Uuid::new_v5(&self.namespace, id.as_bytes()))
    }
}

impl<F> IdentityProvider for F
where
    F: Fn(&str) -> IdentityToken + Send + Sync,
{
    fn derive(&self, id: &str) -> IdentityToken {
        self(id)
    }
}

impl IdentityToken {
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDS: [&str; 7] = [
        "office_fan",
        "nonu_fan",
        "master_br_fan",
        "family_lr_fan",
        "dining_fan",
        "ikkuru_fan",
        "guest_fan",
    ];

    #[test]
    fn test_derive_is_deterministic() {
        let a = NamespacedUuid::default();
        let b = NamespacedUuid::default();

        for id in IDS {
            assert_eq!(a.derive(id), a.derive(id));
            assert_eq!(a.derive(id), b.derive(id));
        }
    }

    #[test]
    fn test_derive_is_injective() {
        let provider = NamespacedUuid::default();
        let mut tokens = IDS.map(|id| provider.derive(id)).to_vec();

        tokens.sort();
        tokens.dedup();

        assert_eq!(tokens.len(), IDS.len());
    }

    #[test]
    fn test_namespace_changes_tokens() {
        let default = NamespacedUuid::default();
        let other = NamespacedUuid::new(Uuid::from_u128(1));

        assert_ne!(default.derive("office_fan"), other.derive("office_fan"));
    }

    #[test]
    fn test_closure_provider() {
        let fixed = IdentityToken::from_uuid(Uuid::from_u128(42));
        let provider = move |_: &str| fixed;

        assert_eq!(provider.derive("anything"), fixed);
        assert_eq!(fixed.to_string(), "00000000-0000-0000-0000-00000000002a");
    }
}
