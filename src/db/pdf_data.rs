//! Extracted page data operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;

/// Persisted page record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PageRecord {
    pub id: i64,
    pub file_name: String,
    pub page_number: i64,
    pub text: String,
    pub image_data: String,
}

/// Insert request
#[derive(Debug, Clone)]
pub struct NewPageRecord<'a> {
    pub file_name: &'a str,
    pub page_number: i64,
    pub text: &'a str,
    pub image_data: &'a str,
}

/// Page record repository
pub struct PageRecordRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PageRecordRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a record
    pub async fn create(&self, record: &NewPageRecord<'_>) -> Result<PageRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO pdf_data (file_name, page_number, text, image_data)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(record.file_name)
        .bind(record.page_number)
        .bind(record.text)
        .bind(record.image_data)
        .execute(self.pool)
        .await?;

        Ok(PageRecord {
            id: result.last_insert_rowid(),
            file_name: record.file_name.to_string(),
            page_number: record.page_number,
            text: record.text.to_string(),
            image_data: record.image_data.to_string(),
        })
    }

    /// All records, oldest first
    pub async fn list(&self) -> Result<Vec<PageRecord>> {
        let records = sqlx::query_as::<_, PageRecord>(
            r#"
            SELECT id, file_name, page_number, text, image_data
            FROM pdf_data
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    /// Records for one uploaded file, oldest first
    pub async fn list_for_file(&self, file_name: &str) -> Result<Vec<PageRecord>> {
        let records = sqlx::query_as::<_, PageRecord>(
            r#"
            SELECT id, file_name, page_number, text, image_data
            FROM pdf_data
            WHERE file_name = ?
            ORDER BY id
            "#,
        )
        .bind(file_name)
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;
    use tempfile::TempDir;

    async fn test_pool(dir: &TempDir) -> SqlitePool {
        let url = format!("sqlite://{}", dir.path().join("test.db").display());
        create_pool(&url, 1).await.unwrap()
    }

    fn record<'a>(file_name: &'a str, page_number: i64, image_data: &'a str) -> NewPageRecord<'a> {
        NewPageRecord {
            file_name,
            page_number,
            text: "page text",
            image_data,
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let repo = PageRecordRepository::new(&pool);

        let first = repo.create(&record("a.pdf", 1, "AAAA")).await.unwrap();
        let second = repo.create(&record("a.pdf", 1, "BBBB")).await.unwrap();

        assert!(second.id > first.id);

        let all = repo.list().await.unwrap();
        assert_eq!(all, vec![first, second]);
    }

    #[tokio::test]
    async fn test_list_for_file() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let repo = PageRecordRepository::new(&pool);

        repo.create(&record("a.pdf", 1, "AAAA")).await.unwrap();
        repo.create(&record("b.pdf", 2, "BBBB")).await.unwrap();

        let records = repo.list_for_file("b.pdf").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].page_number, 2);
        assert_eq!(records[0].image_data, "BBBB");

        assert!(repo.list_for_file("missing.pdf").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_table() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;

        assert!(PageRecordRepository::new(&pool).list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;

        crate::db::initialize_schema(&pool).await.unwrap();
        crate::db::initialize_schema(&pool).await.unwrap();
    }
}
