// OS monitoring module - raw process queries and memory capacity

mod meminfo;
mod source;

pub use meminfo::memory_capacity;
pub use source::{ProcessSource, ProcfsSource, RawProcess};
