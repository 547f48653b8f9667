pub mod duration;
pub mod path_template;
pub mod protocol;

pub use duration::parse_duration;
