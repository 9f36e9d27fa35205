//! # memory_tree
//!
//! Gesture-controlled particle Christmas tree. A hand tracker feeds the
//! gesture pipeline on a background thread; the main loop turns its
//! events into scene transitions and camera steering for the
//! [`tree_swarm`] choreographer and draws the result.
//!
//! ## Gesture → Scene mapping
//!
//! | Gesture | Scene |
//! |---|---|
//! | Closed fist | Assemble the tree (`FORMED`) |
//! | Open palm | Scatter everything (`CHAOS`) |
//! | Pinch | Pull one photo card to the front (`FOCUS`) |
//! | Wrist left / right | Orbit the camera |
//!
//! ## Feature flags
//!
//! * (default) — **Simulation mode**: the keyboard and mouse play a virtual hand.
//! * `leap` — **Hardware mode**: hand landmarks from a LeapMotion controller via LeapC.
//!
//! ### Keyboard shortcuts
//!
//! | Key | Action |
//! |---|---|
//! | `1` | Open palm |
//! | `2` | Closed fist |
//! | `3` | Pinch |
//! | `4` | Relaxed hand (no gesture) |
//! | `H` | Hide the hand |
//! | `←` / `→` (hold) | Drift the wrist |
//! | Left mouse drag | Place the wrist under the pointer |
//! | `C` | Centre the wrist |
//! | `Space` | Manual assemble / disperse |
//! | `G` | Toggle the debug overlay |
//! | `Q` / `Escape` | Quit |

pub mod error;
pub mod config;
pub mod landmarks;
pub mod gesture;
pub mod signal;
pub mod source;
pub mod pipeline;
pub mod visualizer;
pub mod app;
