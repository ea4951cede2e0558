/// Route serving both the listing (GET) and the removal request (POST).
pub const LISTING_ROUTE: &str = "/scanned";

pub const DEFAULT_CONFIG_PATH: &str = "modelgate.toml";
pub const DEFAULT_ARCHIVE_DIR: &str = "DONE";
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Summary field carrying the number of infected files in one scanner run.
pub const INFECTED_FILES_FIELD: &str = "Infected files";
/// Marker line separating per-file entries from the summary block.
pub const SUMMARY_MARKER: &str = "SUMMARY";

pub const STL_HEADER_LEN: u64 = 80;
pub const STL_PREAMBLE_LEN: u64 = 84;
pub const STL_TRIANGLE_LEN: u64 = 50;

/// Number of characters inspected for the ASCII STL keyword sniff.
pub const ASCII_SNIFF_CHARS: usize = 4096;

pub const ASCII_STL_REQUIRED: [&str; 5] =
    ["facet normal", "outer loop", "vertex", "endloop", "endfacet"];

pub const ASCII_STL_KEYWORDS: [&str; 7] = [
    "solid",
    "endsolid",
    "facet normal",
    "outer loop",
    "vertex",
    "endloop",
    "endfacet",
];

pub const OBJ_KEYWORDS: [&str; 9] = ["o", "#", "vn", "s", "mtllib", "f", "vt", "v", "usemtl"];
