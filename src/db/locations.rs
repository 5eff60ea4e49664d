use sqlx::PgPool;

use super::models::Location;

pub async fn list(pool: &PgPool) -> Result<Vec<Location>, sqlx::Error> {
    sqlx::query_as::<_, Location>(
        r#"
        SELECT id, name, created_at, updated_at
        FROM locations
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get(pool: &PgPool, id: i64) -> Result<Option<Location>, sqlx::Error> {
    sqlx::query_as::<_, Location>(
        r#"
        SELECT id, name, created_at, updated_at
        FROM locations
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Locations matching `id` exactly and/or containing `name`
/// (case-insensitive). A `None` filter matches everything.
pub async fn search(
    pool: &PgPool,
    id: Option<i64>,
    name: Option<&str>,
) -> Result<Vec<Location>, sqlx::Error> {
    sqlx::query_as::<_, Location>(
        r#"
        SELECT id, name, created_at, updated_at
        FROM locations
        WHERE ($1::bigint IS NULL OR id = $1)
          AND ($2::text   IS NULL OR name ILIKE '%' || $2 || '%')
        ORDER BY id
        "#,
    )
    .bind(id)
    .bind(name)
    .fetch_all(pool)
    .await
}

/// Insert every name in one transaction; either all locations are created or
/// none are.
pub async fn insert_many(pool: &PgPool, names: &[String]) -> Result<Vec<Location>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut created = Vec::with_capacity(names.len());

    for name in names {
        let location = sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (name)
            VALUES ($1)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;
        created.push(location);
    }

    tx.commit().await?;
    Ok(created)
}

/// Rename a location. Returns `None` when no location has `id`.
pub async fn update_name(
    pool: &PgPool,
    id: i64,
    name: &str,
) -> Result<Option<Location>, sqlx::Error> {
    sqlx::query_as::<_, Location>(
        r#"
        UPDATE locations
        SET name = $2, updated_at = now()
        WHERE id = $1
        RETURNING id, name, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(name)
    .fetch_optional(pool)
    .await
}

/// Returns `false` when no location has `id`.
pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM locations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
