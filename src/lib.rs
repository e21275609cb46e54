pub mod bluetooth;
pub mod compose;
pub mod config;
pub mod paths;
pub mod pipeline;
pub mod player;
pub mod process;
pub mod prompt;
pub mod sink;
pub mod speech;
