//! End-to-end sweep tests against a mocked registry.

mod sweep_e2e;
