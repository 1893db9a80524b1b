pub mod decode;
pub mod hand;
pub mod kinematic;
pub mod roi;

pub use decode::{joint_origin, DecodedPart, Decoding, HandDecoder};
pub use hand::{Finger, HandPose, TrackedPoint3D, DEFAULT_POSE, POSE_DIM};
pub use kinematic::KinematicDecoder;
pub use roi::{
    bounding_box_from_points, compute_bounding_box, BoundingBox, RoiEstimator,
    DEFAULT_MIN_BOX_SIZE, DEFAULT_PADDING,
};
