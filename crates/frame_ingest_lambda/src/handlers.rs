pub mod coordinator;
pub mod invocation;
