//! Cableguy E2E workflow engine
//!
//! Drives the cable configurator through a randomized plug selection and
//! checks the rendered brand count against what the backend reported:
//! - Opens each slot's picker, picks a rendered option at random
//! - Correlates the click with the AJAX response it provokes
//! - Extracts plugs, brands and article counts from that response
//! - Compares the UI's count for the chosen brand with the backend's
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 SuiteRunner (scenarios, results)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Workflow                                                   │
//! │    ├── SlotSelector(begin) ─┐                               │
//! │    ├── SlotSelector(end) ───┼── RandomPicker                │
//! │    │                        ├── ResponseCorrelator          │
//! │    │                        └── ResultExtractor             │
//! │    ├── choose_brand(latest record)                          │
//! │    └── Verifier(backend count, rendered count)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BrowserDriver (trait)  ──  PlaywrightDriver (Node bridge)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod correlator;
pub mod driver;
pub mod error;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod slot;
pub mod workflow;

pub use correlator::{PendingCorrelation, ResponseCorrelator, ResponsePredicate};
pub use driver::{BrowserDriver, ResponseStream};
pub use error::{E2eError, E2eResult};
pub use runner::{PlaywrightSessions, RunResult, SessionFactory, SuiteResult, SuiteRunner};
pub use scenario::Scenario;
pub use slot::{SlotPhase, SlotSelection, SlotSelector};
pub use workflow::{Workflow, WorkflowReport};
