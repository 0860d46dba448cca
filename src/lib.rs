//! # Facility Registry
//!
//! Data and API layer of a health-facility registry: administrative
//! geography, facilities and their attributes, community health units and
//! workers, and the approval records for them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │   Entities   │──▶│  Repository  │──▶│  SQLite  │
//! │ common/facil │   │ CRUD+filters │   │  (sqlx)  │
//! │ ities/chul   │   └──────┬───────┘   └──────────┘
//! └──────────────┘          │
//!                  ┌────────┴────────┐
//!                  ▼                 ▼
//!             ┌──────────┐     ┌──────────┐
//!             │   CLI    │     │   HTTP   │
//!             │(registry)│     │  (axum)  │
//!             └──────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! registry init               # create database schema
//! registry serve              # start the HTTP API
//! registry index-settings     # print search-index analyzer settings
//! registry stats              # per-table record counts
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`schema`] | Shared record base and the `Record` contract |
//! | [`common`] | Counties, sub-counties, wards, contacts |
//! | [`facilities`] | Facilities, owners, services, practitioners |
//! | [`chul`] | Community health units, workers, approvals |
//! | [`codes`] | Sequence and random code generation |
//! | [`validate`] | Field validation helpers |
//! | [`filters`] | List query filters |
//! | [`repo`] | Generic CRUD |
//! | [`search`] | Search-index settings |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`stats`] | Per-table record counts |
//! | [`error`] | Error types |

pub mod schema;

pub mod chul;
pub mod codes;
pub mod common;
pub mod config;
pub mod db;
pub mod error;
pub mod facilities;
pub mod filters;
pub mod migrate;
pub mod repo;
pub mod search;
pub mod server;
pub mod stats;
pub mod validate;
