//! BuildReplay Core - Construction Episode Replay Engine
//!
//! Replays a recorded multi-discipline construction episode over a 3D grid
//! of cells:
//! 1. **Ingestion**: numpy/Python reprs or JSON become a typed placement
//!    catalog and action matrix, with no code evaluation
//! 2. **Timeline**: every step decodes eight discipline slots into placement
//!    events that accumulate per-cell work toward cached requirements
//! 3. **Navigation**: clamped seek, cadence-driven playback and a sandboxed
//!    slice filter over cell coordinates
//!
//! Rendering and charting are sink traits; the engine never draws.

pub mod aggregator;
pub mod catalog;
pub mod completion;
pub mod decoder;
pub mod discipline;
pub mod engine;
pub mod error;
pub mod navigator;
pub mod sink;
pub mod slice;
pub mod telemetry;
pub mod text;

// Re-export key types for convenience
pub use aggregator::{CellState, CellStateMap};
pub use catalog::{ActionMatrix, ActionRow, CellCoord, PlacementCatalog, RawPlacement};
pub use decoder::{ActionSlot, DecodeAnomaly, PlacementEvent};
pub use discipline::{Discipline, DISCIPLINE_COUNT};
pub use engine::{EngineConfig, EngineState, FinalState, LoadReport, ReplayEngine};
pub use error::{EpisodeError, SliceError};
pub use navigator::{Advance, Navigator, PlaybackState};
pub use sink::{CellUpdate, RecordingSink, RenderSink};
pub use slice::SliceFilter;
pub use telemetry::{PlacementSeries, StepTotals, TelemetrySink};
