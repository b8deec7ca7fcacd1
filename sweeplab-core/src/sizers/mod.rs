//! Turning an entry budget into a share count.

pub mod exposure;

pub use exposure::{ExposureSizer, SizingConfig};

/// Sizing policy used by the simulator on every entry.
pub trait Sizer: Send + Sync {
    /// Shares purchasable with `budget` at an all-in `price`; 0.0 when none.
    fn size(&self, budget: f64, price: f64) -> f64;
}
