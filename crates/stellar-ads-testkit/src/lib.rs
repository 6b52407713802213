//! Scriptable stub of the Stellar Ads backend.
//!
//! Serves `GET /api/ad`, `POST /api/impression`, and `GET /api/click` with
//! per-request scripted delay, status, and body, and records every request
//! for later assertions. The SDK's integration tests run against it; the
//! `stellar-ads-stub` binary serves a fixed catalog for local runs of the
//! host harness.
//!
//! ```no_run
//! # async fn demo() -> Result<(), stellar_ads_testkit::ServerError> {
//! use std::sync::Arc;
//! use stellar_ads_testkit::{Endpoint, Reply, StubServer, StubState};
//!
//! let stub = StubServer::spawn(Arc::new(StubState::new())).await?;
//! stub.state().script(Endpoint::Ad, Reply::no_ad()).await;
//! println!("backend at {}", stub.base_url());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::StubError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, StubServer, start_server};
pub use state::{Catalog, Endpoint, RecordedRequest, Reply, StubState};
