//! Keeps the self-citation cache in step with its upstream sources.
//!
//! The [`Refresher`] drives a pass over the records that need attention:
//! every record on a [rebuild](Refresher::rebuild), or the records touched
//! since the last pass on an [incremental](Refresher::incremental) run. For
//! each record the [`StalenessOracle`] decides whether the cached entry can
//! be kept, the host's [`SelfCiteDetector`](upstream::SelfCiteDetector)
//! recomputes it otherwise, and the [`CacheDiffUpdater`] writes only what
//! changed. The [`WatermarkTracker`] remembers how far a completed pass got.
//!
//! Everything upstream (records, the citation graph, author identities and
//! the detectors themselves) sits behind the traits in [`upstream`].

pub mod accumulator;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod pacing;
pub mod reconcile;
mod refresh;
pub mod staleness;
pub mod upstream;
pub mod watermark;

pub use accumulator::Accumulator;
pub use pacing::{CancelFlag, Control, Pacer, Phase, Progress, Unpaced};
pub use reconcile::{CacheDiffUpdater, Reconciled};
pub use refresh::{Mode, PassReport, Refresher, Status};
pub use selfcites_cache::RecordId;
pub use staleness::{Freshness, StalenessOracle};
pub use upstream::{Detectors, Upstream};
pub use watermark::WatermarkTracker;
