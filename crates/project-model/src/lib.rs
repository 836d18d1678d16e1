//! ClipForge Project Model
//!
//! Defines the core data contracts for ClipForge projects:
//! - **Trim:** In/out point validation against a clip's source duration
//! - **Geometry:** Time ↔ pixel mapping and track lanes for the timeline canvas
//! - **Clips:** Imported source clips, captions, and placed timeline clips
//! - **Timeline:** The two-track authoring state (placement, trim, split, move)
//! - **Project:** The media library plus timeline, persisted as JSON
//!
//! All times are seconds as `f64`. Source-local times (trim points, caption
//! cues) are measured from the first frame of the source file; timeline times
//! (`start_time`, playhead) are measured from the start of the arrangement.

pub mod caption;
pub mod clip;
pub mod geometry;
pub mod library;
pub mod project;
pub mod timeline;
pub mod trim;

pub use caption::*;
pub use clip::*;
pub use library::*;
pub use project::*;
pub use timeline::*;
pub use trim::*;
