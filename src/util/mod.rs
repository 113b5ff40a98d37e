pub mod path_safety;
pub mod post_date;
pub mod slug;
