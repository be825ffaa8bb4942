mod parse;

pub use parse::{parse_enum, parse_timestamp};
