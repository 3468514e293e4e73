use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

const LOCAL_PREFIX: &str = "local:";

/// Identifier generated on the client before the remote store has assigned one.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct LocalId {
    /// Per-submission seed (UUID v7).
    pub seed: Uuid,
    /// Position inside a generated series; `0` for standalone tasks.
    pub ordinal: u16,
}

/// Identifier of a task.
///
/// Remote and local identifiers live in disjoint variants, so a locally
/// generated id can never be mistaken for one issued by the store.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum TaskId {
    /// Permanent identifier issued by the remote store.
    Remote(u64),
    /// Provisional identifier issued by this client.
    Local(LocalId),
}

impl TaskId {
    /// Generate a fresh local identifier.
    #[must_use]
    pub fn local() -> Self {
        // UUID version 7 is time ordered, so ids issued in one session stay monotonic.
        Self::Local(LocalId {
            seed: Uuid::now_v7(),
            ordinal: 0,
        })
    }

    /// Identifier of the `ordinal`-th instance generated from this id.
    #[must_use]
    pub fn derive(self, ordinal: u16) -> Self {
        let seed = match self {
            Self::Local(local) => local.seed,
            Self::Remote(id) => Uuid::from_u64_pair(0, id),
        };
        Self::Local(LocalId { seed, ordinal })
    }

    /// Returns true when the id has been issued by the remote store.
    #[must_use]
    pub const fn is_remote(self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(id) => write!(f, "{id}"),
            Self::Local(local) => write!(f, "{LOCAL_PREFIX}{}:{}", local.seed, local.ordinal),
        }
    }
}

/// Error returned when a task id string is malformed.
#[derive(Debug, Error)]
pub enum IdParseError {
    /// The remote id is not an unsigned integer.
    #[error("invalid remote task id '{0}'")]
    Remote(String),
    /// The local id does not follow `local:<uuid>:<ordinal>`.
    #[error("invalid local task id '{0}'")]
    Local(String),
}

impl FromStr for TaskId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let Some(rest) = trimmed.strip_prefix(LOCAL_PREFIX) else {
            return trimmed
                .parse()
                .map(Self::Remote)
                .map_err(|_| IdParseError::Remote(trimmed.to_owned()));
        };
        let invalid = || IdParseError::Local(trimmed.to_owned());
        let (seed, ordinal) = rest.rsplit_once(':').ok_or_else(invalid)?;
        Ok(Self::Local(LocalId {
            seed: Uuid::parse_str(seed).map_err(|_| invalid())?,
            ordinal: ordinal.parse().map_err(|_| invalid())?,
        }))
    }
}

impl Serialize for TaskId {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
