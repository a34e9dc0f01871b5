//! Streaming procedural terrain: tiles around a moving viewpoint are sampled,
//! meshed at a distance-based LOD and pushed to a [`sink::TileSink`].

pub mod sink;
pub mod store;
pub mod streaming;

pub use sink::{NullSink, RecordingSink, TileSink};
pub use store::{ChunkStore, MeshSlot, Placement, Tile, TileState};
pub use streaming::{StreamingController, TickReport};
