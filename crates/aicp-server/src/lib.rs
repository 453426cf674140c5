//! # aicp-server
//!
//! HTTP surface of the query gateway.
//!
//! | Route | Auth | Purpose |
//! |-------|------|---------|
//! | `GET /` | no | service description |
//! | `GET /health` | no | database, model and schema readiness |
//! | `POST /api/auth/login` | no | exchange an API key for a session token |
//! | `POST /api/auth/logout` | bearer | end the session |
//! | `POST /api/query` | bearer | run one question through the pipeline |
//! | `GET /api/schema` | bearer | schema description and policy notes |
//! | `GET /api/user/profile` | bearer | identity, policy and session times |
//! | `GET /api/sessions` | no | active sessions, when `server.expose_sessions` is set |

pub mod auth;
pub mod bootstrap;
pub mod error;
mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use bootstrap::{Services, connect_services};
pub use error::ApiError;
pub use routes::create_router;
pub use server::serve;
pub use state::{AppState, HealthCheck};
