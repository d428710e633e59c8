//! The write-side command surface: one command struct plus one handler per
//! state change. Handlers own a store handle; each successful handle call
//! appends exactly one event to one stream.

pub mod v1;
