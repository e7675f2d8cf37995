use chrono::FixedOffset;
use sqlx::{
    Executor, MySqlPool,
    mysql::MySqlPoolOptions,
};

/// Connects the pool with every session pinned to the service's UTC offset,
/// then applies pending migrations.
pub async fn init_db(
    database_url: &str,
    max_connections: u32,
    offset: FixedOffset,
) -> Result<MySqlPool, sqlx::Error> {
    let time_zone = format!("SET time_zone = '{}'", offset);

    let pool = MySqlPoolOptions::new()
        .max_connections(max_connections)
        .after_connect(move |conn, _meta| {
            let time_zone = time_zone.clone();
            Box::pin(async move {
                conn.execute(time_zone.as_str()).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
