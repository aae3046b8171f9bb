pub mod job;
pub mod phase;
pub mod results;
pub mod task;
pub mod wordcount;
pub mod worker;

pub use job::*;
pub use phase::*;
pub use results::*;
pub use task::*;
pub use worker::*;
