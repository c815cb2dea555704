mod error;
mod job;
mod results;
mod step;
mod target;

pub use error::*;
pub use job::*;
pub use results::*;
pub use step::*;
pub use target::*;
