//! Versioned domain event definitions. Payload schemas are owned by the
//! domain layer; the engine treats them as opaque JSON.

pub mod v1;
