pub mod api;
pub mod command;
pub mod controller;
pub mod retry;
pub mod task;
