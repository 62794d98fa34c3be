mod export;
mod highlight;
mod post_process;
mod summary;

pub use export::*;
pub use highlight::*;
pub use post_process::*;
pub use summary::*;
