pub mod descriptor;
pub use descriptor::{FrameLayout, Mapping};

mod pool;

pub(crate) mod queue;
pub(crate) use queue::ScatterGatherQueue;
