// doc constants
pub const DOC_ID: &str = "_id";
pub const CLASS_KEY: &str = "_class_";
pub const OBJECT_KEY: &str = "__object_";
pub const OBJECT_CLASS: &str = "class";
pub const OBJECT_FIELDS: &str = "fields";
pub const RESERVED_FIELDS: [&str; 3] = [DOC_ID, CLASS_KEY, OBJECT_KEY];

// Compile-time assertion for reserved fields count
const _: () = {
    const RESERVED_FIELDS_COUNT: usize = 3;
    const ACTUAL_COUNT: usize = RESERVED_FIELDS.len();
    const _: [(); 1] = [(); (ACTUAL_COUNT == RESERVED_FIELDS_COUNT) as usize];
};

// query option constants, recognized inside filter maps
pub const OPT_FIELDS: &str = "fields";
pub const OPT_SKIP: &str = "skip";
pub const OPT_LIMIT: &str = "limit";
pub const OPT_SORT: &str = "sort";
pub const OPT_HINT: &str = "hint";
pub const OPT_SNAPSHOT: &str = "snapshot";
pub const OPT_TIMEOUT: &str = "timeout";
pub const OPTION_KEYS: [&str; 7] = [
    OPT_FIELDS,
    OPT_SKIP,
    OPT_LIMIT,
    OPT_SORT,
    OPT_HINT,
    OPT_SNAPSHOT,
    OPT_TIMEOUT,
];

// wire operator constants
pub const OP_SET: &str = "$set";
pub const OP_INC: &str = "$inc";
pub const OP_PUSH: &str = "$push";
pub const OP_POP: &str = "$pop";

pub const FIELD_SEPARATOR: &str = ".";

// default database name when the configuration does not supply one
pub const DEFAULT_DATABASE: &str = "praline";

pub const PRALINE_VERSION: &str = env!("CARGO_PKG_VERSION");
