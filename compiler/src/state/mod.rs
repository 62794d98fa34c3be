mod filters;
mod persistence;
mod presets;
mod rules;
mod validation;

pub use filters::*;
pub use persistence::*;
pub use presets::*;
pub use rules::*;
pub use validation::*;
