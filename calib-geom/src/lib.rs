//! Linear multi-view geometry for the tracking calibration crates.
//!
//! ## Triangulation
//!
//! In this problem we know the projection matrices of several cameras and the image of the
//! same point in each of them. We want to find the 3d point whose projections agree with
//! all observations.
//!
//! - `X` the point we are trying to triangulate
//! - `a` the image of `X` in camera A
//! - `b` the image of `X` in camera B
//! - `O` the optical center of a camera
//! - `@` the image plane
//!
//! ```text
//!                        @
//!                        @
//!               X--------b--------O
//!              /         @
//!             /          @
//!            /           @
//!           /            @
//!   @@@@@@@a@@@@@
//!         /
//!        /
//!       /
//!      O
//! ```
//!
//! Each observation `x` of a camera `P` requires `x × (P X) = 0`. Stacking these constraints
//! for all cameras gives a homogeneous linear system in `X`, solved in [`triangulation`].
//!
//! ## Projection estimation
//!
//! [`dlt`] runs the same kind of construction the other way around: given known 3d points
//! and their images, it estimates the camera's projection matrix and splits it into
//! intrinsics and pose.

pub mod dlt;
pub mod triangulation;

pub use dlt::{decompose_projection, projection_dlt, ProjectionDecomposition};
pub use triangulation::{triangulate, triangulate_pair, LinearTriangulator};
