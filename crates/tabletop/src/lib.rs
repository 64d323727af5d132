#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use tabletop_3d as k3d;

#[doc(inline)]
pub use tabletop_features as features;

#[doc(inline)]
pub use tabletop_perception as perception;

#[doc(inline)]
pub use tabletop_pickplace as pickplace;

#[doc(inline)]
pub use tabletop_node as node;
