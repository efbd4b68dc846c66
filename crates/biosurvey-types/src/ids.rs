//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every persisted entity has a strongly-typed ID so that a species ID can
//! never be passed where a project ID is expected. App-side generation uses
//! UUID v7 (time-ordered) for index locality; rows inserted by `PostgreSQL`
//! get `gen_random_uuid()` defaults instead.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

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

        impl core::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<Uuid>().map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a registered user.
    UserId
}

define_id! {
    /// Unique identifier for a monitoring project.
    ProjectId
}

define_id! {
    /// Unique identifier for a species in the shared catalog.
    SpeciesId
}

define_id! {
    /// Unique identifier for a single field observation.
    ObservationId
}

define_id! {
    /// Unique identifier for a stored indicator value.
    IndicatorId
}

define_id! {
    /// Unique identifier for a background job (export, report, cleanup).
    JobId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let species = SpeciesId::new();
        let project = ProjectId::new();
        assert_ne!(species.into_inner(), Uuid::nil());
        assert_ne!(project.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_parses_from_str() {
        let id = ProjectId::new();
        let parsed: Result<ProjectId, _> = id.to_string().parse();
        assert_eq!(parsed.ok(), Some(id));
        assert!("not-a-uuid".parse::<ProjectId>().is_err());
    }

    #[test]
    fn id_serializes_as_bare_uuid() {
        let id = SpeciesId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{}\"", id.into_inner()));
    }
}
