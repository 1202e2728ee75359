// doc constants
pub const DOC_ID: &str = "_id";
pub const FIELD_SEPARATOR: char = '.';

// grouping constants
pub const GROUP_KEY: &str = "key";
pub const GROUP_ITEMS: &str = "items";
pub const COUNT_FIELD: &str = "count";

// store constants
pub const MEMORY_SCHEME: &str = "memory";
pub const MEMORY_STORE_FAMILY: &str = "memory";
pub const REPLICA_SET_OPTION: &str = "replicaSet";

// configuration constants
pub const ENV_CONNECTION_STRING: &str = "DOCREPO_CONNECTION_STRING";
pub const ENV_DATABASE: &str = "DOCREPO_DATABASE";
