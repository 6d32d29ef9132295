#![cfg(feature = "integration-tests")]

use common::domain::{
    ApproveDeviceRequestRepoInput, CreateDeviceRepoInput, CreateDeviceRequestRepoInput,
    DeactivateDeviceRequestRepoInput, DeviceRepository, DomainError, GetDeviceByAddressRepoInput,
    GetDeviceRepoInput, GetDeviceRequestRepoInput,
};
use common::postgres::{MigrationRunner, PostgresClient, PostgresConfig, PostgresDeviceRepository};
use std::sync::Arc;
use std::time::Duration;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

const ADDRESS: &str = "AA:BB:CC:DD:EE:FF";

async fn setup_test_db() -> (ContainerAsync<Postgres>, PostgresDeviceRepository, PostgresClient) {
    let postgres = Postgres::default().start().await.unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let client = PostgresClient::new(
        &host.to_string(),
        port,
        "postgres",
        "postgres",
        "postgres",
        5,
    )
    .expect("Failed to create client");

    MigrationRunner::new(client.clone())
        .run_migrations()
        .await
        .expect("Migrations failed");

    let repository = PostgresDeviceRepository::new(client.clone());
    (postgres, repository, client)
}

fn approve_input(address: &str) -> ApproveDeviceRequestRepoInput {
    ApproveDeviceRequestRepoInput {
        hardware_address: address.to_string(),
        name: "Living Room".to_string(),
        location: "Floor1".to_string(),
    }
}

async fn active_request_count(client: &PostgresClient, address: &str) -> i64 {
    let conn = client.get_connection().await.unwrap();
    let row = conn
        .query_one(
            "SELECT COUNT(*) FROM requested_devices WHERE mac_address = $1 AND active",
            &[&address],
        )
        .await
        .unwrap();
    row.get(0)
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_migrations_are_idempotent() {
    let (_container, _repo, client) = setup_test_db().await;

    let runner = MigrationRunner::new(client);
    assert_eq!(runner.run_migrations().await.unwrap(), 0);
    assert_eq!(runner.applied_versions().await.unwrap().len(), 3);
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_request_and_lookup() {
    let (_container, repo, _client) = setup_test_db().await;

    let created = repo
        .create_request(CreateDeviceRequestRepoInput {
            hardware_address: ADDRESS.to_string(),
        })
        .await
        .unwrap();
    assert!(created.active);
    assert!(created.created_at.is_some());

    let active = repo.list_active_requests().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].hardware_address, ADDRESS);

    let found = repo
        .get_request_by_address(GetDeviceRequestRepoInput {
            hardware_address: ADDRESS.to_string(),
            active_only: true,
        })
        .await
        .unwrap();
    assert_eq!(found.unwrap().request_id, created.request_id);
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_second_active_request_rejected() {
    let (_container, repo, _client) = setup_test_db().await;
    let input = CreateDeviceRequestRepoInput {
        hardware_address: ADDRESS.to_string(),
    };

    repo.create_request(input.clone()).await.unwrap();
    let result = repo.create_request(input).await;

    assert!(matches!(result, Err(DomainError::DeviceAlreadyRequested(_))));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_deactivate_keeps_history() {
    let (_container, repo, client) = setup_test_db().await;

    repo.create_request(CreateDeviceRequestRepoInput {
        hardware_address: ADDRESS.to_string(),
    })
    .await
    .unwrap();

    let changed = repo
        .deactivate_request(DeactivateDeviceRequestRepoInput {
            hardware_address: ADDRESS.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(changed, 1);
    assert_eq!(active_request_count(&client, ADDRESS).await, 0);

    // idempotent
    let changed = repo
        .deactivate_request(DeactivateDeviceRequestRepoInput {
            hardware_address: ADDRESS.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(changed, 0);

    let latest = repo
        .get_request_by_address(GetDeviceRequestRepoInput {
            hardware_address: ADDRESS.to_string(),
            active_only: false,
        })
        .await
        .unwrap()
        .unwrap();
    assert!(!latest.active);

    let active = repo
        .get_request_by_address(GetDeviceRequestRepoInput {
            hardware_address: ADDRESS.to_string(),
            active_only: true,
        })
        .await
        .unwrap();
    assert!(active.is_none());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_create_device_unique_address() {
    let (_container, repo, _client) = setup_test_db().await;
    let input = CreateDeviceRepoInput {
        hardware_address: ADDRESS.to_string(),
        name: "Kitchen".to_string(),
        location: String::new(),
    };

    let device = repo.create_device(input.clone()).await.unwrap();
    let result = repo.create_device(input).await;
    assert!(matches!(result, Err(DomainError::DeviceAlreadyRegistered(_))));

    let by_id = repo
        .get_device(GetDeviceRepoInput {
            device_id: device.device_id,
        })
        .await
        .unwrap();
    let by_id = by_id.unwrap();
    assert_eq!(by_id.device_id, device.device_id);
    assert_eq!(by_id.hardware_address, ADDRESS);
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_approve_consumes_request() {
    let (_container, repo, client) = setup_test_db().await;

    repo.create_request(CreateDeviceRequestRepoInput {
        hardware_address: ADDRESS.to_string(),
    })
    .await
    .unwrap();

    let device = repo.approve_request(approve_input(ADDRESS)).await.unwrap();
    assert_eq!(device.name, "Living Room");
    assert_eq!(device.location, "Floor1");
    assert_eq!(active_request_count(&client, ADDRESS).await, 0);

    let found = repo
        .get_device_by_address(GetDeviceByAddressRepoInput {
            hardware_address: ADDRESS.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(found.map(|d| d.device_id), Some(device.device_id));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_approve_without_request_writes_nothing() {
    let (_container, repo, _client) = setup_test_db().await;

    let result = repo.approve_request(approve_input(ADDRESS)).await;

    assert!(matches!(result, Err(DomainError::DeviceNotRequested(_))));
    assert!(repo.list_devices().await.unwrap().is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_approve_rolls_back_when_device_exists() {
    let (_container, repo, client) = setup_test_db().await;

    repo.create_device(CreateDeviceRepoInput {
        hardware_address: ADDRESS.to_string(),
        name: "Existing".to_string(),
        location: String::new(),
    })
    .await
    .unwrap();
    repo.create_request(CreateDeviceRequestRepoInput {
        hardware_address: ADDRESS.to_string(),
    })
    .await
    .unwrap();

    let result = repo.approve_request(approve_input(ADDRESS)).await;
    assert!(matches!(result, Err(DomainError::DeviceAlreadyRegistered(_))));

    // the deactivation was rolled back with the failed insert
    assert_eq!(active_request_count(&client, ADDRESS).await, 1);
    assert_eq!(repo.list_devices().await.unwrap().len(), 1);
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_concurrent_approve_creates_one_device() {
    let (_container, repo, _client) = setup_test_db().await;
    let repo = Arc::new(repo);

    repo.create_request(CreateDeviceRequestRepoInput {
        hardware_address: ADDRESS.to_string(),
    })
    .await
    .unwrap();

    let first = tokio::spawn({
        let repo = repo.clone();
        async move { repo.approve_request(approve_input(ADDRESS)).await }
    });
    let second = tokio::spawn({
        let repo = repo.clone();
        async move { repo.approve_request(approve_input(ADDRESS)).await }
    });

    let results = [first.await.unwrap(), second.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(DomainError::DeviceNotRequested(_)) | Err(DomainError::DeviceAlreadyRegistered(_))
    )));
    assert_eq!(repo.list_devices().await.unwrap().len(), 1);
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_exhausted_pool_fails_with_repository_error() {
    let postgres = Postgres::default().start().await.unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let client = PostgresClient::from_config(&PostgresConfig {
        host: host.to_string(),
        port,
        database: "postgres".to_string(),
        username: "postgres".to_string(),
        password: "postgres".to_string(),
        max_pool_size: 1,
        pool_timeout_secs: 1,
    })
    .expect("Failed to create client");
    MigrationRunner::new(client.clone())
        .run_migrations()
        .await
        .expect("Migrations failed");
    let repo = PostgresDeviceRepository::new(client.clone());

    let _held = client.get_connection().await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(10), repo.list_devices())
        .await
        .expect("checkout should time out instead of blocking");

    assert!(matches!(result, Err(DomainError::RepositoryError(_))));
}
