pub mod command_parser;
pub mod url_parser;

pub use command_parser::parse_prefixed_command;
pub use url_parser::{extract_urls, parse_candidate};
