//! # Calibration Core
//!
//! Common types for the tracking calibration crates. Every crate in this workspace that
//! works with poses, projections or point correspondences depends on this crate, so it is
//! kept small: a rigid [`Pose`], the [`PointPair`] correspondence, the shared [`CalibError`],
//! and the handful of projection and decomposition helpers that the estimators all need.
//!
//! ## Conventions
//!
//! A [`Pose`] maps points *into* the frame it describes. For a camera this is the
//! world-to-camera transform, so the projection matrix of a camera with intrinsics `K` is
//! `P = K [R | t]` (see [`projection_matrix`]). For a tracked marker it is the
//! marker-to-world transform, so a point fixed on the marker at `m` appears in the world at
//! `pose.transform(m)`.
//!
//! Projection matrices are plain [`nalgebra::Matrix3x4`] values. A point is in front of a
//! camera when its [`depth`] under that camera's projection is positive.
//!
//! ```text
//!          P = K [R | t]
//!   X ---------------------> x = (P X) / (P X).z
//!  (3d, world)               (2d, image)
//! ```

mod error;
mod matches;
mod normalize;
mod pose;
mod projection;
mod svd;

pub use error::*;
pub use matches::*;
pub use nalgebra;
pub use normalize::*;
pub use pose::*;
pub use projection::*;
pub use sample_consensus;
pub use svd::*;
