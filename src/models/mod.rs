pub mod stats;
pub mod task;
pub mod user;

pub use stats::{DayWindow, TaskStats};
pub use task::{
    PageRequest, SortField, SortOrder, Task, TaskFilter, TaskInput, TaskPriority, TaskQuery,
    TaskSort, TaskStatus, TaskUpdate,
};
pub use user::{
    ChangePasswordRequest, LoginRequest, NewUser, ProfileChanges, RegisterRequest,
    UpdateProfileRequest, User, UserCredentials,
};
