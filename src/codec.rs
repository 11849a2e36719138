//! Codec: opaque binary serialization of `TaskDefinition`.
//!
//! `Marshal` is infallible for well-formed inputs; `Unmarshal` reports a
//! dedicated `CodecError` on failure, which `error_map::deserialize_error`
//! later lifts into `TaskDbError::Deserialize` with guid context the codec
//! itself doesn't have. The state machine never inspects or rewrites the
//! bytes this module produces — see `state_machine.rs`.
//!
//! This performs structured encoding only. Encrypting the bytes at rest is
//! a separate, out-of-scope concern a caller may layer in front of
//! `marshal`/`unmarshal`.

use crate::types::TaskDefinition;

/// Failure to decode a byte string into a `TaskDefinition`.
#[derive(Debug, thiserror::Error)]
#[error("codec deserialize error: {0}")]
pub struct CodecError(String);

/// Serialize a `TaskDefinition` to its durable byte representation.
pub fn marshal(definition: &TaskDefinition) -> Vec<u8> {
    bincode::serialize(definition).expect("TaskDefinition fields are always serializable")
}

/// Deserialize bytes previously produced by `marshal`.
pub fn unmarshal(bytes: &[u8]) -> Result<TaskDefinition, CodecError> {
    bincode::deserialize(bytes).map_err(|err| CodecError(err.to_string()))
}
