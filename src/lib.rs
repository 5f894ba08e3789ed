//! Label matching library - finds specimen records that duplicate an image
//! label and lets an operator resolve each one.

pub mod audit;
pub mod console;
pub mod engine;
pub mod grid;
pub mod interrupt;
pub mod matcher;
pub mod memory_store;
pub mod models;
pub mod progress;
pub mod protocol;
pub mod safety;
pub mod session;
pub mod sqlite_store;
pub mod store;

#[cfg(test)]
mod testing;
