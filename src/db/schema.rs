//! Database schema initialization

use sqlx::SqlitePool;

use crate::error::Result;

/// Initialize the database schema
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA_SQL)
        .execute(pool)
        .await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- One row per image found on a page; the page text is repeated on each row
CREATE TABLE IF NOT EXISTS pdf_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name TEXT NOT NULL,
    page_number INTEGER NOT NULL,
    text TEXT NOT NULL,
    -- base64 of the extracted image bytes
    image_data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS ix_pdf_data_id ON pdf_data(id);
CREATE INDEX IF NOT EXISTS ix_pdf_data_file_name ON pdf_data(file_name);
"#;
