//! # Lorebook
//!
//! AI-assisted workspace notes. Lorebook keeps named workspaces of short
//! text documents and answers natural-language questions against them,
//! suggests cross-document links, generates topical tags, and derives a
//! knowledge graph — all driven by pre-trained NLP models consumed as
//! black-box scoring capabilities behind an HTTP model server.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────────┐   ┌──────────────┐
//! │ Workspaces │──▶│ lorebook-core  │◀──│ Model server │
//! │ fs / memory│   │ chunk + score  │   │ answer/embed │
//! └────────────┘   │ rank + trunc.  │   │ /classify    │
//!                  └──────┬─────────┘   └──────────────┘
//!                         │
//!            ┌────────────┤
//!            ▼            ▼
//!       ┌─────────┐  ┌──────────┐
//!       │   CLI   │  │   HTTP   │
//!       │ (lore)  │  │  (axum)  │
//!       └─────────┘  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lore workspaces create team-notes    # ensure a workspace
//! lore pages add team-notes --title "Roadmap" --file roadmap.md
//! lore ask team-notes "what ships in Q3?"
//! lore link team-notes --text "storage engine rollout"
//! lore tags team-notes
//! lore graph team-notes
//! lore serve                           # start the JSON API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`store_fs`] | Filesystem workspace store |
//! | [`adapter_http`] | HTTP model-server adapter |
//! | [`service`] | Ingestion helpers (embed-on-write) |
//! | [`server`] | JSON API server |

pub mod adapter_http;
pub mod config;
pub mod server;
pub mod service;
pub mod store_fs;
