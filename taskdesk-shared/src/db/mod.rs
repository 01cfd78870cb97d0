/// Postgres plumbing
///
/// - `pool`: connection pool with a startup health check
/// - `migrations`: embedded schema migrations
///
/// Queries live with the models in [`crate::models`]; the store adapter in
/// [`crate::store::postgres`] is the only caller.
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
