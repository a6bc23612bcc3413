pub mod queue;

pub use queue::{queue_page, QueueVm};
