//! Concrete [crate::x::XConn] implementations.
#[cfg(feature = "x11rb")]
pub mod x11rb;
