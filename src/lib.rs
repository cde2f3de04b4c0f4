//! Tether - core toolkit for building REST API connectors.
//!
//! Connectors let a hosting platform call third-party APIs under pluggable
//! authentication schemes. This crate holds the pieces every connector
//! shares; vendor-specific templates live in the `tether-connectors` crate.
//!
//! # Architecture
//!
//! ```text
//! Hosting platform (invokes skills)
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │       Skill boundary (skill)             │
//! │  - read typed parameters                 │
//! │  - map typed errors to STATUS codes      │
//! └─────────────────────────────────────────┘
//!          ↓                       ↓
//! ┌──────────────────┐   ┌──────────────────┐
//! │  Auth provider   │   │  Job executor    │
//! │  (auth)          │   │  (job)           │
//! │  - build headers │   │  - submit        │
//! │  - self-test     │   │  - poll          │
//! └──────────────────┘   │  - fetch results │
//!          ↓             └──────────────────┘
//!     Upstream REST API
//! ```
//!
//! # Core Types
//!
//! - [`params::ParamSet`] - declares named, typed parameters and converts
//!   raw input mappings into typed values
//! - [`auth::AuthProvider`] - capability interface for authentication schemes
//! - [`job::JobExecutor`] - submit/poll/fetch driver for asynchronous
//!   upstream jobs
//! - [`skill::respond`] - the uniform `{STATUS, <payload>}` result shape

// Parameter declaration and value conversion
pub mod params;

// Authentication providers (API key, basic, delegated basic, OAuth2)
pub mod auth;

// Remote job submit/poll/fetch state machine
pub mod job;

// Invocation boundary: error-to-status mapping and response packaging
pub mod skill;

// Re-export the types connector templates touch on every call
pub use auth::{AuthContext, AuthProvider, FromAuthContext, SelfTest};
pub use job::{JobConfig, JobExecutor, JobHandle, JobState, TimeRange};
pub use params::{DataType, ParamSet, ParamSpec, ParamValue};
pub use skill::SkillError;
