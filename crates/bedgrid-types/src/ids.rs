//! Type-safe identifier wrappers.
//!
//! Hospitals are keyed by the small integer ids carried in the catalog
//! dataset. Observer subscriptions get UUID v7 (time-ordered) handles so
//! registry iteration follows registration order.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Catalog identifier of a hospital.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct HospitalId(pub u32);

impl HospitalId {
    /// Return the raw numeric id.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for HospitalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for HospitalId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id! {
    /// Handle for a registered snapshot observer.
    SubscriptionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hospital_id_is_transparent() {
        let json = serde_json::to_string(&HospitalId(150)).ok();
        assert_eq!(json.as_deref(), Some("150"));
    }

    #[test]
    fn subscription_ids_are_unique() {
        let a = SubscriptionId::new();
        let b = SubscriptionId::new();
        assert_ne!(a, b);
        assert_eq!(a.into_inner().get_version_num(), 7);
    }
}
