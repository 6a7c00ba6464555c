//! Emitters — editor workspace file and devcontainer/codespaces permission
//! injection (spec.md §6).

pub mod devcontainer;
pub mod workspace_file;
