//! Database schema definitions

/// SQL to create all tables
/// NOTE: option values are opaque TEXT; typed decoding happens in the engine
pub const CREATE_TABLES: &str = r#"
-- Named settings (status flags, epoch timestamps, counters, JSON lists)
CREATE TABLE IF NOT EXISTS options (
    option_name TEXT PRIMARY KEY NOT NULL,
    option_value TEXT NOT NULL
)
"#;
