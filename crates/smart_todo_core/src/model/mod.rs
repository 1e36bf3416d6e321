mod task;

pub use task::{Priority, Task, TaskId, format_due_date, parse_due_date};
