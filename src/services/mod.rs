pub mod bucket;
pub mod fs_bucket;
pub mod memory_bucket;
