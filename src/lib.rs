//! # `tracking-calib`
//!
//! Batteries-included calibration primitives for tracking
//!
//! This crate gathers the workspace crates in one place so that a calibration routine can be
//! written against a single dependency. Production code can depend on the individual crates
//! instead to keep the dependency graph small.
//!
//! All of the basic types (poses, point pairs, projections and the error type) are included
//! in the root of the crate. The algorithms live in modules:
//!
//! ## Modules
//! * [`consensus`] - robust estimation with RANSAC
//! * [`estimate`] - estimation of tool tips and fundamental matrices from data
//! * [`geom`] - linear triangulation and projection matrix estimation
//! * [`optimize`] - nonlinear refinement of triangulated points
//! * [`reconstruction`] - 3d points from one or more calibrated views

pub use calib_core::*;

/// Consensus algorithms (RANSAC)
pub mod consensus {
    pub use calib_consensus::{
        required_iterations, ConsensusEstimator, ModelEstimator, ModelEvaluator, ModelResidual,
        Ransac, RansacParameters, RansacResult, Termination,
    };
}

/// Estimation algorithms
pub mod estimate {
    pub use eight_point::{
        estimate_fundamental, estimate_fundamental_with, fundamental_matrix_from_poses,
        fundamental_ransac_parameters, get_fundamental_matrix, pose_from_fundamental_matrix,
        EightPoint, EssentialMatrix, FundamentalEvaluator, FundamentalMatrix,
    };
    pub use tool_tip::{
        estimate_position_3d_6d, estimate_tool_tip, estimate_tool_tip_with,
        tool_tip_ransac_parameters, ToolTip, ToolTipEstimator, ToolTipEvaluator,
    };
}

/// Computational geometry
pub mod geom {
    pub use calib_geom::*;
}

/// Optimization algorithms
pub mod optimize {
    pub use calib_optimize::*;

    /// Levenberg-Marquardt
    pub mod lm {
        pub use levenberg_marquardt::*;
    }
}

/// Point reconstruction and correspondence search
pub mod reconstruction {
    pub use calib_reconstruction::*;
}
