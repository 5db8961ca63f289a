pub mod task;
pub mod user;

pub use task::{
    clamp_time_spent, parse_status_filter, CreateTaskRequest, NewTask, Priority, Task,
    TaskChanges, TaskStatus, UpdateTaskRequest, MAX_TIME_SPENT,
};
pub use user::{LoginInfo, NewUser, PublicUser, SignupInfo, User, ValidSignup};
