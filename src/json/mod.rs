pub mod adapter;
pub mod path;

pub use adapter::JsonAdapter;
