//! Library side of the `classlens` binary: command implementations that the
//! integration tests drive directly.

pub mod commands;
