//! HTTP API for generating, reserving and scanning hostnames.
//!
//! All bodies are JSON. Failed requests return a body of the form:
//!
//! ```json
//! { "error": "parameter \"site\" failed validation: ...", "kind": "validation_failure" }
//! ```
//!
//! Where `kind` is stable and `error` is a human readable description.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/api/templates` (GET), `/api/templates/{id}` (GET)
//!
//!   List all configured templates (`{"templates": [...], "total": N}`), or get one by ID.
//!   Unknown IDs return HTTP 404.
//!
//! ## `/api/hostnames/generate` (POST)
//!
//!   Expects a JSON request body of the form:
//!
//!   ```json
//!   { "template_id": 1, "params": { "site": "ams", "role": "web" }, "check_dns": false }
//!   ```
//!
//!   Assembles a hostname, allocating a new sequence number if the template has a sequence
//!   group. Nothing is reserved. With `check_dns` the result carries a `dns_check` object,
//!   omitted if the lookup failed.
//!
//! ## `/api/hostnames/reserve` (POST)
//!
//!   Same body as `generate`, minus `check_dns`. Returns HTTP 201 (Created) and the stored
//!   reservation. Templates without a sequence group return HTTP 409.
//!
//! ## `/api/hostnames` (GET), `/api/hostnames/{id}` (GET)
//!
//!   List reservations, optionally filtered with `?template_id=N`, or get one by ID.
//!
//! ## `/api/sequences/next/{template_id}` (GET)
//!
//!   The sequence number the next generation would receive, without consuming it.
//!
//! ## `/api/dns/check/{hostname}` (GET)
//!
//!   Resolve one hostname. Resolver failures return HTTP 502 (Bad Gateway).
//!
//! ## `/api/dns/scan` (POST)
//!
//!   Expects a JSON request body of the form:
//!
//!   ```json
//!   { "template_id": 1, "params": { "site": "ams" }, "start_seq": 1, "end_seq": 100, "max_concurrent": 10 }
//!   ```
//!
//!   Checks every hostname of the inclusive sequence range with at most `max_concurrent`
//!   lookups in flight. Results are ordered by sequence number. No sequence numbers are
//!   consumed.

mod api_error;
mod model;
mod routes;
pub mod server;

pub use server::{new, router, AppState};
