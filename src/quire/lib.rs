//! # Quire Architecture
//!
//! Quire is a **UI-agnostic library for managing Markdown blog drafts**. The
//! `quire` binary is one client of it; a desktop web-view shell would be
//! another, calling the same facade.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, prints results, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade: resolves id prefixes, dispatches            │
//! │  - Returns CmdResult (data + messages) or QuireError        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Lifecycle Layer (manager.rs, snippets.rs, settings.rs)     │
//! │  - Owns the in-memory collections                           │
//! │  - Persist first, then commit to memory                     │
//! │  - Image reconciliation, mirror, notifications, auto-save   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/, images.rs)                          │
//! │  - StorageBackend trait: FsBackend, CacheBackend, MemBackend│
//! │  - ImageStore trait: FsImageStore, UnavailableImages        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The backend is chosen once at startup ([`init`]) and never changes while
//! the process runs.
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code takes Rust arguments, returns Rust values, and
//! never writes to stdout/stderr or exits the process. Diagnostics go through
//! `tracing`; the binary decides where they end up.
//!
//! ## Threading
//!
//! Everything runs on one thread, in call order. The auto-save timer is an
//! explicit deadline polled by the host loop rather than a background task.
//!
//! ## Testing Strategy
//!
//! 1. **Lifecycle** (`manager.rs`, `snippets.rs`): thorough unit tests over
//!    `MemBackend` with failure injection.
//! 2. **Storage** (`store/`): unit tests plus `tests/fs_backend_test.rs`.
//! 3. **API** (`api.rs`): dispatch and message tests.
//! 4. **CLI**: argument parsing tests and `tests/cli_e2e.rs`.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`manager`]: Post lifecycle (CRUD, status, images, mirror, events)
//! - [`autosave`]: Restartable debounce timer
//! - [`references`]: Image reference extraction from Markdown
//! - [`images`]: Managed image files
//! - [`snippets`]: Reusable markup snippets
//! - [`settings`]: The settings document
//! - [`store`]: Storage abstraction and implementations
//! - [`model`]: Core data types (`Post`, `Snippet`, `PostPatch`)
//! - [`notify`]: `CmdResult`, messages, error-to-message mapping
//! - [`export`] / [`import`]: Markdown with front matter, tarballs
//! - [`editor`]: External editor integration
//! - [`init`]: Data root, backend selection, wiring
//! - [`error`]: Error types
//! - `cli`: Argument parsing and printing for the binary (not part of the lib API)

pub mod api;
pub mod autosave;
pub mod editor;
pub mod error;
pub mod export;
pub mod images;
pub mod import;
pub mod init;
pub mod manager;
pub mod model;
pub mod notify;
pub mod references;
pub mod settings;
pub mod snippets;
pub mod store;

#[cfg(test)]
pub mod test_utils;
