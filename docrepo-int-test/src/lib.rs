pub mod post_service;
pub mod test_util;
