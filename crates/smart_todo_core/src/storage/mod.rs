pub mod json_store;
pub mod kv;

pub use json_store::{STATE_KEY, StateLoad, load_state, save_state};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, store_dir};
