pub mod cardinality;
pub mod color;
pub mod config;
pub mod consumer;
pub mod instrument;
pub mod orchestrator;
pub mod realtime_thread;
pub mod scheduler;
pub mod sequence;
pub mod tick;
pub mod time;
