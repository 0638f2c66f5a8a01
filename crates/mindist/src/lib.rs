#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use mindist_3d as k3d;

#[doc(inline)]
pub use mindist_optim as optim;

#[doc(inline)]
pub use mindist_align as align;
