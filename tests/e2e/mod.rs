//! End-to-end tests for the update engine.
//!
//! A stub HTTP feed, a fake service supervisor, and a fake process
//! table stand in for the outside world; everything else is the real
//! engine running against a temporary install tree.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod fakes;
mod feed_server;
mod scenarios;

pub use fakes::{FakeProcessControl, FakeSupervisor};
pub use feed_server::{ReleaseSpec, StubFeed};
pub use harness::UpdaterHarness;
