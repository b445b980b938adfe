#[macro_use]
extern crate lazy_static;

mod black_box;

pub use crate::black_box::{parse_level_filter, BlackBox};
