pub mod config;
pub mod logger;
pub mod error;
pub mod server;
pub mod util;
pub mod frontmatter;
pub mod category_map;
pub mod post_store;
pub mod post_list;
pub mod og;
pub mod query_string;
#[cfg(test)]
mod test_data;
