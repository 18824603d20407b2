//! Stubsmith: response rendering for an HTTP stub server.
//!
//! A [`ServedEvent`](model::ServedEvent) pairs an inbound request with the
//! response definition of the stub it matched. The
//! [`StubResponseRenderer`](render::StubResponseRenderer) turns it into a
//! [`Response`](model::Response): proxied upstream or synthesized from the
//! definition (file, script, inline body, delays, faults), then passed through
//! the ordered transformer chain. The request journal and its paginated admin
//! view live in [`journal`] and [`admin_api`].

pub mod admin_api;
pub mod backends;
pub mod config;
pub mod delay;
pub mod fault;
pub mod journal;
pub mod metrics;
pub mod model;
pub mod render;
pub mod scripting;
pub mod server;
pub mod transform;
