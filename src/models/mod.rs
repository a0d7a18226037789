pub mod status;
pub mod work_queue;

pub use status::ExecutionStatus;
pub use work_queue::WorkQueueSnapshot;
