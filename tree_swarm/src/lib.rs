//! # tree_swarm
//!
//! Procedural particle choreography for the memory tree. Tens of thousands
//! of agents glide between a dispersed chaos cloud and an assembled cone,
//! driven by a three-state scene machine.
//!
//! ## Pools
//!
//! | Pool | Default count | Chaos volume | On the tree |
//! |---|---|---|---|
//! | Foliage | 15000 | sphere r=25 | anywhere inside the cone |
//! | Photos | 150 | cube side 70 | shell, 0.5 outside the surface |
//! | Props | 100 | cube side 60 | shell, 95% of the surface radius |
//! | Lights | 400 | cube side 60 | shell, 0.3 outside the surface |
//! | Star | 1 | apex | 1.8 above the apex |
//!
//! ## Scene states
//!
//! | State | Foliage / props / lights | Photos | Camera |
//! |---|---|---|---|
//! | `Chaos` | drift to chaos | tumble to chaos | held |
//! | `Formed` | assemble, lights blink | face outward and wobble | auto-rotate |
//! | `Focus` | drift to chaos | one card flies to the lens, others shrink | held |
//!
//! A live control value always steers the camera, whatever the state.
//!
//! ## Frame loop
//!
//! ```text
//! handle(event)*  →  advance(dt, control)  →  snapshot()  →  renderer
//! ```

pub mod error;
pub mod palette;
pub mod formation;
pub mod pool;
pub mod kinds;
pub mod scene;
pub mod camera;
pub mod motion;
pub mod snapshot;
pub mod choreographer;

pub use choreographer::{Choreographer, SwarmConfig};
pub use error::{FieldError, PoolError, SwarmError};
pub use scene::{Gesture, SceneEvent, SceneState};
pub use snapshot::{AgentTransform, SceneFrame, Variant, VisualParams};
