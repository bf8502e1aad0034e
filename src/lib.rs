//! rfscope: SDR spectrum acquisition and antenna resonance characterization
//!
//! Drives a USB software-defined radio through frequency sweeps, estimates
//! the noise floor at each step, finds antenna resonances and their
//! harmonics, and streams a live spectrum with waterfall history to a
//! consumer process that polls published artifacts.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Pure domain types, configuration, snapshots, errors
//! - `ports/` - Trait definitions for the SDR hardware and publication
//! - `dsp/` - Signal processing (pure functions, no I/O)
//! - `resonance/` - Peak, bandwidth, Q-factor and harmonic analysis
//! - `sweep/` - Sweep controller state machine
//! - `live/` - Live acquisition loop and waterfall history
//! - `adapters/` - Implementations of ports (simulated SDR, RTL-SDR, file and channel publishers)
//! - `publish/` - Artifact layout and the consumer-side reader
//! - `supervisor` - One worker process per role
//! - `worker` - Wiring used by the `rfscope` binary

// Core domain (pure, no I/O)
pub mod domain;
pub mod dsp;
pub mod ports;
pub mod resonance;

// Workers
pub mod live;
pub mod sweep;

// Adapters (external I/O)
pub mod adapters;
pub mod publish;

// Process boundary
pub mod supervisor;
pub mod worker;
