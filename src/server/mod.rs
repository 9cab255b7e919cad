//! REST API server for the motion transforms and per-shot sessions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────┐                      ┌──────────────────────────┐
//! │   API Server Thread     │                      │  Arc<SharedApiState>     │
//! │   (rouille HTTP)        │  ── read / write ──▶ │   sessions: SessionStore │
//! │                         │                      │   settings: AppSettings  │
//! │  POST /api/log/load/{u} │                      └──────────────────────────┘
//! └─────────────────────────┘
//! ```
//!
//! - **rouille** - sync HTTP server
//! - **SharedApiState** - sessions keyed by shot uuid, current settings
//!
//! # Endpoints
//!
//! | Method | Path                        | Description                          |
//! |--------|-----------------------------|--------------------------------------|
//! | GET    | `/api/health`               | Health check                         |
//! | POST   | `/api/transform/forward`    | Simple params → expanded settings    |
//! | POST   | `/api/transform/reverse`    | Expanded settings → simple params    |
//! | POST   | `/api/log/load/{shot_uuid}` | Load a shot session from an inference log |
//! | GET    | `/api/session/{shot_uuid}`  | Current session of a shot            |
//! | GET    | `/api/steps/{seconds}`      | Interpolation steps for a clip length |

mod api;

pub use api::{ApiServer, SharedApiState};
