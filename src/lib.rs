#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::return_self_not_must_use,
    clippy::similar_names,
    clippy::struct_field_names,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::unnecessary_map_or
)]

//! Pluggable session-state store for multi-tenant conversational services.
//!
//! A [`SessionStore`] persists per-session conversation history and tenant
//! policy snapshots with optimistic locking: every successful update bumps
//! the record's version, and an update presenting a stale version fails with
//! [`SessionError::VersionConflict`]. Two interchangeable backends exist, an
//! in-process map and a networked key-value cache, selected through
//! [`sessions::create_session_store`].
//!
//! ```no_run
//! use sessionvault::history::HistoryLimits;
//! use sessionvault::sessions::{create_session_store, OpContext, Role, SessionData, StoreOptions, StoreType};
//!
//! # async fn demo() -> Result<(), sessionvault::SessionError> {
//! let store = create_session_store(StoreType::Memory, StoreOptions::default())?;
//! let ctx = OpContext::background();
//!
//! let mut session = SessionData::new("session-123");
//! store.create(&ctx, &mut session).await?;
//!
//! loop {
//!     let mut current = store.get(&ctx, "session-123").await?.expect("created above");
//!     current.push_turn(Role::User, "hello", &HistoryLimits::default());
//!     match store.update(&ctx, &mut current).await {
//!         Err(e) if e.is_version_conflict() => continue,
//!         other => break other?,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod history;
pub mod observability;
pub mod sessions;
pub mod tenancy;
pub mod vectorstore;

pub use config::Config;
pub use sessions::{SessionData, SessionError, SessionStore};
