use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A timestamp with microsecond precision.
///
/// Serialized as RFC3339 with exactly six fractional digits and a `Z` suffix,
/// e.g. `2024-05-01T12:00:00.123456Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MicroTime(DateTime<Utc>);

impl MicroTime {
    /// Truncate `time` to whole microseconds.
    pub fn new(time: DateTime<Utc>) -> Self {
        Self(time.trunc_subsecs(6))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for MicroTime {
    fn from(time: DateTime<Utc>) -> Self {
        Self::new(time)
    }
}

impl std::fmt::Display for MicroTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S%.6fZ"))
    }
}

impl Serialize for MicroTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MicroTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| Self::new(t.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom)
    }
}

/// Opaque optimistic-concurrency token owned by the state store.
///
/// Only equality is meaningful; tokens carry no ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVersion(String);

impl ResourceVersion {
    /// Wrap a store-issued token. Callers outside the store never mint these.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

/// Back-link from a dependent object to the resource that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    /// Set by the store on every write; stale values make updates conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<ResourceVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaseSpec {
    #[serde(default)]
    pub holder_identity: Option<String>,
    /// How long readers should consider a renewal valid.
    #[serde(default)]
    pub lease_duration_seconds: Option<i32>,
    #[serde(default)]
    pub renew_time: Option<MicroTime>,
}

/// A node liveness lease.
/// Stored at `/registry/leases/<namespace>/<name>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    pub metadata: ObjectMeta,
    pub spec: LeaseSpec,
}

impl Lease {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn has_owner(&self) -> bool {
        !self.metadata.owner_references.is_empty()
    }
}
