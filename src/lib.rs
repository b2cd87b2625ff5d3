//! Basilisk is a terminal chat client for a streamed persona conversation.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation store, the request cycle state machine,
//!   the incremental stream decoder, the signal bus, and the session task
//!   that ties them together.
//! - [`api`] defines the payloads exchanged with the completion endpoint and
//!   the prompt, story-prompt and media services.
//! - [`cli`] parses arguments and runs the interactive chat loop, the
//!   one-shot `say` command, and the admin subcommands.
//! - [`utils`] holds URL helpers and the plain-text transcript log.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
