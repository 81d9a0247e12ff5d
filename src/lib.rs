//! # Lookbook
//!
//! Backend service for a directory web application: browse people and
//! project case studies, search a locally maintained embedding index, and
//! run AI-assisted intake for admins.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │ Content store │──▶│ Index job    │──▶│  SQLite    │
//! │ (headless CMS)│   │ embed+upsert │   │ slug-keyed │
//! └──────┬───────┘   └──────────────┘   └─────┬─────┘
//!        │                                    │
//!        ▼                                    ▼
//!   ┌──────────┐                        ┌──────────┐
//!   │ /projects │  structured filters   │ /search  │
//!   │ (browse)  │                       │ (index)  │
//!   └──────────┘                        └──────────┘
//! ```
//!
//! The content store owns people and projects; this service only reads
//! them. The indexing job denormalizes both into slug-keyed SQLite tables
//! with embedding vectors. Browse queries go straight to the content
//! store; simple search runs against the local index. Admin intake goes
//! extract → prepare → manual confirmation in the CMS, which then calls
//! back into `/revalidate`.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`content`] | Content store client and query builder |
//! | [`taxonomy`] | Skill/sector vocabulary helpers |
//! | [`browse`] | Structured filter path with pagination |
//! | [`search`] | Simple search over the index tables |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index_job`] | Search index maintenance |
//! | [`extraction`] | LLM profile extraction |
//! | [`prepare`] | Profile normalization for admin review |
//! | [`moderation`] | Moderation provider seam |
//! | [`leads`] | CRM event log and webhook forwarding |
//! | [`revalidate`] | Cached page invalidation |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod browse;
pub mod config;
pub mod content;
pub mod db;
pub mod embedding;
pub mod extraction;
pub mod index_job;
pub mod leads;
pub mod migrate;
pub mod models;
pub mod moderation;
pub mod prepare;
pub mod revalidate;
pub mod search;
pub mod server;
pub mod taxonomy;
