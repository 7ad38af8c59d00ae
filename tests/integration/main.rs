//! Integration tests for Quarry

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use httpmock::prelude::*;
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn quarry() -> Command {
        cargo_bin_cmd!("quarry")
    }

    /// Config file pointing the store into `dir`
    fn config_in(dir: &Path) -> PathBuf {
        let config = dir.join("config.toml");
        let store = dir.join("store.json");
        std::fs::write(
            &config,
            format!("[cache]\nstore_path = '{}'\n", store.display()),
        )
        .unwrap();
        config
    }

    #[test]
    fn help_displays() {
        quarry()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cached resource fetcher"));
    }

    #[test]
    fn version_displays() {
        quarry()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("quarry"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        quarry()
            .args(["config", "path"])
            .env("QUARRY_CONFIG", &config)
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        quarry()
            .args(["config", "show"])
            .env("QUARRY_CONFIG", temp.path().join("missing.toml"))
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("default_lifespan_secs = 3600"));
    }

    #[test]
    fn config_init_writes_file() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        quarry()
            .args(["config", "init"])
            .env("QUARRY_CONFIG", &config)
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(config.exists());

        quarry()
            .args(["config", "init"])
            .env("QUARRY_CONFIG", &config)
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_config_fails_with_hint() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        std::fs::write(&config, "[http]\ntimeout_secs = \"never\"\n").unwrap();

        quarry()
            .args(["--config"])
            .arg(&config)
            .args(["cache", "path"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn cache_list_empty() {
        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());
        quarry()
            .arg("--config")
            .arg(&config)
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached entries"));
    }

    #[test]
    fn cache_path_prints_configured_store() {
        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());
        quarry()
            .arg("--config")
            .arg(&config)
            .args(["cache", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("store.json"));
        assert!(!temp.path().join("store.json").exists());
    }

    #[test]
    fn corrupt_store_file_can_be_cleared() {
        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());
        let store = temp.path().join("store.json");
        std::fs::write(&store, "garbage").unwrap();

        quarry()
            .arg("--config")
            .arg(&config)
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached entries"));

        quarry()
            .arg("--config")
            .arg(&config)
            .args(["cache", "clear"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cleared 0 cached entries"));

        assert_eq!(std::fs::read_to_string(&store).unwrap(), "{}");
    }

    #[test]
    fn fetch_caches_transformed_value() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/data").header("accept", "application/json");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"value":42}"#);
        });

        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());
        let url = server.url("/data");

        for _ in 0..2 {
            quarry()
                .arg("--config")
                .arg(&config)
                .args(["fetch", &url, "--ttl", "60", "--pointer", "/value"])
                .assert()
                .success()
                .stdout(predicate::str::diff("42\n"));
        }
        mock.assert_hits(1);

        quarry()
            .arg("--config")
            .arg(&config)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(url.as_str()));

        quarry()
            .arg("--config")
            .arg(&config)
            .args(["cache", "clear"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cleared 1 cached entry"));
    }

    #[test]
    fn fetch_no_cache_always_requests() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/plain");
            then.status(200).body("hello");
        });

        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());
        let url = server.url("/plain");

        for _ in 0..2 {
            quarry()
                .arg("--config")
                .arg(&config)
                .args(["fetch", &url, "--text", "--no-cache"])
                .assert()
                .success()
                .stdout(predicate::str::diff("hello\n"));
        }
        mock.assert_hits(2);
        assert!(!temp.path().join("store.json").exists());
    }

    #[test]
    fn fetch_error_status_fails() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());

        quarry()
            .arg("--config")
            .arg(&config)
            .args(["fetch", &server.url("/missing")])
            .assert()
            .failure()
            .stderr(predicate::str::contains("HTTP 404"));
    }
}

mod registry_tests {
    use httpmock::prelude::*;
    use quarry::request::UreqTransport;
    use quarry::storage::{Clock, SystemClock};
    use quarry::{
        FileStore, KeyValueStore, MemoryDescriptor, NetworkDescriptor, QuarryError, Registry,
        RequestDescriptor, ResolutionSpec, StorageContext, StorageContexts,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn registry_with(store: Arc<dyn KeyValueStore>) -> Registry {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let storage = Arc::new(StorageContext::new(store, clock));
        Registry::with_transport(Arc::new(UreqTransport::default()), storage)
    }

    fn answer(url: String, lifespan: i64) -> NetworkDescriptor {
        NetworkDescriptor::factory(move |_query| {
            Ok(ResolutionSpec::new(RequestDescriptor::json(url.clone()))
                .with_transform(|r| r["answer"].clone())
                .with_lifespan_secs(lifespan))
        })
    }

    #[tokio::test]
    async fn cache_expires_in_real_time() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/data");
            then.status(200).body(r#"{"answer":42}"#);
        });

        let registry = registry_with(Arc::new(quarry::MemoryStore::new()));
        let ids = registry.register_network([("answer", answer(server.url("/data"), 1))]);

        assert_eq!(registry.fetch(&ids[0], &[]).await.unwrap(), json!(42));
        assert_eq!(registry.fetch(&ids[0], &[]).await.unwrap(), json!(42));
        mock.assert_hits(1);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(registry.fetch(&ids[0], &[]).await.unwrap(), json!(42));
        mock.assert_hits(2);
    }

    #[tokio::test]
    async fn duplicate_in_flight_request_rejected() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200)
                .delay(Duration::from_millis(300))
                .body(r#"{"answer":42}"#);
        });
        let url = server.url("/slow");

        let registry = registry_with(Arc::new(quarry::MemoryStore::new()));
        let ids = registry.register_network([("slow", answer(url.clone(), 0))]);

        let first = registry.resolve(&ids[0], &[]).unwrap();
        let err = registry.fetch(&ids[0], &[]).await.unwrap_err();
        assert!(matches!(err, QuarryError::Concurrency { .. }));
        assert!(err.to_string().contains(&format!("GET {}", url)));

        assert_eq!(first.await.unwrap(), json!(42));
        assert_eq!(registry.fetch(&ids[0], &[]).await.unwrap(), json!(42));
        mock.assert_hits(2);
    }

    #[tokio::test]
    async fn file_store_serves_later_registries() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/data");
            then.status(200).body(r#"{"answer":42}"#);
        });
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");

        for _ in 0..2 {
            let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&path).unwrap());
            let registry = registry_with(store);
            let ids = registry.register_network([("answer", answer(server.url("/data"), 60))]);
            assert_eq!(registry.fetch(&ids[0], &[]).await.unwrap(), json!(42));
        }

        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn memory_and_network_side_by_side() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/data");
            then.status(200).body(r#"{"answer":42}"#);
        });

        let store: Arc<dyn KeyValueStore> = Arc::new(quarry::MemoryStore::new());
        let contexts = StorageContexts::new(Arc::new(SystemClock));
        let registry = Registry::with_transport(
            Arc::new(UreqTransport::default()),
            contexts.context(&store),
        );

        let memory = registry.register_memory([
            ("foo", MemoryDescriptor::value("local")),
            (
                "sum",
                MemoryDescriptor::factory(|q| {
                    json!(q.iter().filter_map(Value::as_i64).sum::<i64>())
                }),
            ),
        ]);
        let network = registry.register_network([("foo", answer(server.url("/data"), 60))]);

        let local = registry.resolve(&memory[0], &[]).unwrap();
        assert!(local.is_ready());
        assert_eq!(local.await.unwrap(), json!("local"));
        assert_eq!(
            registry.fetch(&memory[1], &[json!(1), json!(2)]).await.unwrap(),
            json!(3)
        );
        mock.assert_hits(0);

        assert_eq!(registry.fetch(&network[0], &[]).await.unwrap(), json!(42));
        mock.assert_hits(1);

        let err = registry.fetch("foo", &[]).await.unwrap_err();
        assert!(matches!(err, QuarryError::InvalidIdentifier { .. }));
    }

    #[tokio::test]
    async fn transport_failure_propagates_unchanged() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/down", listener.local_addr().unwrap());
        drop(listener);

        let registry = registry_with(Arc::new(quarry::MemoryStore::new()));
        let ids = registry.register_network([("down", answer(url, 60))]);

        let err = registry.fetch(&ids[0], &[]).await.unwrap_err();
        assert!(matches!(err, QuarryError::Transport { .. }));
    }
}
