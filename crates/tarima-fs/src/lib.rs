pub mod async_walker;
pub mod io;
pub mod local;
pub mod memory;

pub use io::{atomic_write, atomic_write_str};
pub use local::LocalFileSystem;
pub use memory::MemoryFileSystem;
