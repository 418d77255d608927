pub mod activation;
pub mod navigation;

pub use activation::{ActivationGate, ActivationTransition};
pub use navigation::{IndexChange, NavigationCause, NavigationController};
