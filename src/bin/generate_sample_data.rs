use blog_feed::{
    config::Config, data_seeder::seed_sample_data, infrastructure::sqlite_database::SqliteDatabase,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    println!("Generating sample data");
    println!("Initializing database at {}", config.database.url);
    let database =
        SqliteDatabase::connect(&config.database.url, config.database.max_connections).await?;
    database.initialize().await?;

    let stats = seed_sample_data(&database).await?;

    println!("\nSample data generation complete");
    println!("  - Users created: {}", stats.users);
    println!("  - Groups created: {}", stats.groups);
    println!("  - Posts created: {}", stats.posts);
    println!("  - Comments created: {}", stats.comments);
    println!("  - Follows created: {}", stats.follows);
    println!("\nRun: cargo run --bin blog_feed");
    println!("URL: http://{}", config.server_address());

    Ok(())
}
