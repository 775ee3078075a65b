pub mod clock;
pub mod controller;
pub mod monitor;
pub mod pid;
pub mod requester;
