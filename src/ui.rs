//! Subcommands: thin glue between clap and the core.

pub mod commit;
pub mod init;
pub mod ls;
pub mod restore;
pub mod revisions;
