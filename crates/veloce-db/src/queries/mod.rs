pub mod subtasks;
