pub mod command;
pub mod consts;
pub mod download;
pub mod error;
pub mod executor;
pub mod mosaic;
pub mod pipeline;
pub mod pool;
pub mod registry;
pub mod report;
pub mod stage;
