pub mod fit;

pub use fit::{fit, FitCalculator, FitResult};
