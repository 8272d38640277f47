// Validates the migration files themselves (naming, ordering, checksums)
// without needing a running Postgres.

#[tokio::test]
async fn migration_directory_loads() -> anyhow::Result<()> {
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new("migrations")).await?;

    let migrations: Vec<_> = migrator.iter().collect();
    assert!(!migrations.is_empty(), "expected at least one migration");

    let mut versions: Vec<i64> = migrations.iter().map(|m| m.version).collect();
    let mut sorted = versions.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(versions.len(), sorted.len(), "migration versions must be unique");
    versions.sort_unstable();
    assert_eq!(versions, sorted);

    assert!(
        migrations.iter().any(|m| m.description.contains("init")),
        "expected the initial schema migration"
    );

    Ok(())
}
