pub mod slide;
pub mod slide_list;

pub use slide::*;
pub use slide_list::*;
