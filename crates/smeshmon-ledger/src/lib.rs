mod log;
mod memory;

pub use log::{AppendSummary, EventLog, LogSnapshot};
pub use memory::MemoryEventLog;

#[cfg(test)]
mod tests;
