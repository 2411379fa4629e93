// src/core/mod.rs

// The `core` module is the scan coordinator: it never scans anything itself,
// it drives an external engine and normalises what the engine reports.

/// Data structures shared by every stage: targets, findings, sessions and
/// the `ScanOutcome` handed back to callers.
pub mod models;

/// The control-API seam to the external scanning engine and its ZAP client.
pub mod engine;

/// Bounded-retry reachability check against the engine.
pub mod probe;

/// The crawl -> attack -> collect state machine.
pub mod orchestrator;
