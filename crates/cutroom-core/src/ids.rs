use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(
    /// Identifies an ingested [`crate::model::MediaSource`].
    SourceId
);
entity_id!(
    /// Identifies a [`crate::model::Track`].
    TrackId
);
entity_id!(
    /// Identifies a [`crate::model::Clip`].
    ClipId
);
entity_id!(
    /// Identifies an [`crate::model::Effect`] within a clip's chain.
    EffectId
);

/// Hands out entity ids for one engine.
///
/// `Random` is the default and is safe to merge across sessions. `Sequential`
/// encodes a counter into the UUID bits so fixtures and tests get stable ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdAllocator {
    #[default]
    Random,
    Sequential { next: u128 },
}

impl IdAllocator {
    #[must_use]
    pub fn sequential() -> Self {
        Self::Sequential { next: 1 }
    }

    pub fn next_uuid(&mut self) -> Uuid {
        match self {
            Self::Random => Uuid::new_v4(),
            Self::Sequential { next } => {
                let id = Uuid::from_u128(*next);
                *next = next.wrapping_add(1).max(1);
                id
            }
        }
    }

    /// Marks `id` as taken. A sequential allocator moves its counter past
    /// it; random allocation is unaffected.
    pub fn reserve(&mut self, id: Uuid) {
        if let Self::Sequential { next } = self {
            let taken = id.as_u128();
            if taken >= *next {
                *next = taken.saturating_add(1);
            }
        }
    }

    pub fn source_id(&mut self) -> SourceId {
        SourceId(self.next_uuid())
    }

    pub fn track_id(&mut self) -> TrackId {
        TrackId(self.next_uuid())
    }

    pub fn clip_id(&mut self) -> ClipId {
        ClipId(self.next_uuid())
    }

    pub fn effect_id(&mut self) -> EffectId {
        EffectId(self.next_uuid())
    }
}
