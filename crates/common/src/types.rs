use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one place-order attempt.
///
/// Handed back to the caller on start so later refreshes can be correlated
/// with the same attempt. Payment gateways receive it as the correlation id of
/// their flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(Uuid);

impl ProcessId {
    /// Creates a new random process ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a process ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Returns the id in the string form used as payment correlation id.
    pub fn correlation_id(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ProcessId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ProcessId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ProcessId> for Uuid {
    fn from(id: ProcessId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_id_new_creates_unique_ids() {
        let id1 = ProcessId::new();
        let id2 = ProcessId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn process_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = ProcessId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
        assert_eq!(id.correlation_id(), uuid.to_string());
    }

    #[test]
    fn process_id_serializes_as_plain_uuid() {
        let id = ProcessId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}
