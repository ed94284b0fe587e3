//! Tests for db::factory module - repository creation and configuration.

mod support;

use std::str::FromStr;

use skywatch::db::factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};

#[test]
fn test_repository_type_from_str_postgres() {
    let rt = RepositoryType::from_str("postgres").unwrap();
    assert_eq!(rt, RepositoryType::Postgres);

    let rt = RepositoryType::from_str("POSTGRES").unwrap();
    assert_eq!(rt, RepositoryType::Postgres);

    let rt = RepositoryType::from_str("pg").unwrap();
    assert_eq!(rt, RepositoryType::Postgres);
}

#[test]
fn test_repository_type_from_str_local() {
    let rt = RepositoryType::from_str("local").unwrap();
    assert_eq!(rt, RepositoryType::Local);

    let rt = RepositoryType::from_str("LOCAL").unwrap();
    assert_eq!(rt, RepositoryType::Local);
}

#[test]
fn test_repository_type_from_str_invalid() {
    let result = RepositoryType::from_str("invalid");
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("Unknown repository type"));
}

#[test]
fn test_repository_type_from_env_default() {
    support::with_scoped_env(
        &[
            ("SKYWATCH_REPOSITORY", None),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", None),
        ],
        || {
            let rt = RepositoryType::from_env();
            assert_eq!(rt, RepositoryType::Local);
        },
    );
}

#[test]
fn test_repository_type_from_env_with_database_url() {
    support::with_scoped_env(
        &[
            ("SKYWATCH_REPOSITORY", None),
            ("DATABASE_URL", Some("postgres://localhost/test")),
        ],
        || {
            let rt = RepositoryType::from_env();
            assert_eq!(rt, RepositoryType::Postgres);
        },
    );
}

#[test]
fn test_repository_type_explicit_overrides_database_url() {
    support::with_scoped_env(
        &[
            ("SKYWATCH_REPOSITORY", Some("local")),
            ("DATABASE_URL", Some("postgres://localhost/test")),
        ],
        || {
            let rt = RepositoryType::from_env();
            assert_eq!(rt, RepositoryType::Local);
        },
    );
}

#[test]
fn test_repository_type_from_env_invalid_defaults_to_local() {
    support::with_scoped_env(
        &[
            ("SKYWATCH_REPOSITORY", Some("invalid")),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", None),
        ],
        || {
            let rt = RepositoryType::from_env();
            assert_eq!(rt, RepositoryType::Local);
        },
    );
}

#[tokio::test]
async fn test_create_local_via_factory() {
    let repo = RepositoryFactory::create(RepositoryType::Local, None)
        .await
        .unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[tokio::test]
async fn test_create_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repository.toml");
    std::fs::write(&path, "[repository]\ntype = \"local\"\n").unwrap();

    let repo = RepositoryFactory::from_config_file(&path).await.unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[tokio::test]
async fn test_create_from_missing_config_file_fails() {
    let result = RepositoryFactory::from_config_file("/nonexistent/repository.toml").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_builder_local_repository() {
    let repo = RepositoryBuilder::new()
        .repository_type(RepositoryType::Local)
        .build()
        .await
        .unwrap();

    assert!(repo.health_check().await.unwrap());
}

#[cfg(feature = "postgres-repo")]
#[tokio::test]
async fn test_create_postgres_without_config_fails() {
    let result = RepositoryFactory::create(RepositoryType::Postgres, None).await;
    assert!(result.is_err());
    assert!(result
        .err()
        .unwrap()
        .to_string()
        .contains("requires PostgresConfig"));
}

#[cfg(not(feature = "postgres-repo"))]
#[tokio::test]
async fn test_create_postgres_without_feature_fails() {
    let result = RepositoryFactory::create(RepositoryType::Postgres, None).await;
    assert!(result.is_err());
    let err = result.err().unwrap();
    assert!(err.to_string().contains("feature not enabled"));
}
