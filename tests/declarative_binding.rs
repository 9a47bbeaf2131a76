//! End-to-end tests for declarative binding
//!
//! A configurable type is filled from files on disk, stays bound to its
//! refreshing keys, and reports the markers it could not honour.

use std::sync::Arc;

use anyhow::Result;
use cfgstore::{
    binder, configure_with_default_configuration, set_default_configuration, Bindable, ConfigError,
    Configurable, Configuration, Configurator, DoubleCodec, EnvMarker, Environment, FieldSlot,
    IntCodec, IntSetting, PartitionFile, SettingMarker, Splittable, StringCodec, UrlCodec,
};
use cfgstore_common::logging::{self, LogLevel};
use tempfile::TempDir;

#[derive(Debug, Default)]
struct Server {
    port: i32,
    name: String,
    load_factor: f64,
    upstream: Option<url::Url>,
    pool: Option<Arc<Vec<String>>>,
}

impl Bindable for Server {
    fn fields() -> Vec<FieldSlot<Self>> {
        vec![
            FieldSlot::new("port", |s: &mut Server| &mut s.port),
            FieldSlot::new("name", |s: &mut Server| &mut s.name),
            FieldSlot::new("load_factor", |s: &mut Server| &mut s.load_factor),
            FieldSlot::optional("upstream", |s: &mut Server| &mut s.upstream),
            FieldSlot::optional("pool", |s: &mut Server| &mut s.pool),
        ]
    }
}

impl Configurable for Server {
    fn setting_markers() -> Vec<SettingMarker> {
        vec![
            SettingMarker::of::<IntCodec>("port", "server.port").with_refresh(),
            SettingMarker::of::<StringCodec>("name", "server.name"),
            SettingMarker::of::<DoubleCodec>("load_factor", "server.load_factor"),
            SettingMarker::of::<UrlCodec>("upstream", "server.upstream"),
        ]
    }

    fn env_markers() -> Vec<EnvMarker> {
        vec![EnvMarker::new("pool", "server.pool").with_refresh()]
    }
}

#[test]
fn test_configure_from_split_files() -> Result<()> {
    let dir = TempDir::new()?;
    let main = dir.path().join("server.properties");
    let tuning = dir.path().join("tuning.properties");
    std::fs::write(&main, "# server\nserver.port = 8080\nserver.name = edge\\ one\n")?;
    std::fs::write(&tuning, "server.load_factor: 0.75\nserver.upstream=https://upstream.example/api\n")?;

    let config = Configuration::new();
    config.load_split(&[
        PartitionFile::new("server.", &main),
        PartitionFile::new("server.", &tuning),
    ])?;

    let server = binder::shared(Server::default());
    let report = config.configure(&server);
    assert!(report.is_complete(), "unexpected failures: {:?}", report.failed);
    assert_eq!(report.injected, vec!["port", "name", "load_factor", "upstream"]);
    assert_eq!(report.registered, vec!["port"]);

    {
        let server = server.read();
        assert_eq!(server.port, 8080);
        assert_eq!(server.name, "edge one");
        assert_eq!(server.load_factor, 0.75);
        assert_eq!(server.upstream.as_ref().map(url::Url::as_str), Some("https://upstream.example/api"));
    }

    config.put(&IntSetting::new("server.port"), 9090)?;
    assert_eq!(server.read().port, 9090);
    Ok(())
}

#[test]
fn test_malformed_values_are_reported() -> Result<()> {
    let config = Configuration::new();
    config.load(&mut "server.port=eighty\nserver.upstream=not a url\nserver.name=ok\n".as_bytes())?;

    let server = binder::shared(Server {
        port: 1,
        ..Server::default()
    });
    let report = config.configure(&server);

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].field, "port");
    assert!(matches!(report.failed[0].error, ConfigError::Format { .. }));
    // a malformed URL parses to nothing, so the field stays empty
    assert!(report.absent.contains(&"upstream"));

    let server = server.read();
    assert_eq!(server.port, 1);
    assert_eq!(server.name, "ok");
    assert!(server.upstream.is_none());
    Ok(())
}

#[test]
fn test_environment_markers_share_values() -> Result<()> {
    let env = Environment::new();
    let pool = Arc::new(vec!["a".to_string(), "b".to_string()]);
    env.put_transient("server.pool", Arc::clone(&pool))?;

    let server = binder::shared(Server::default());
    let report = env.configure(&server);
    assert_eq!(report.injected, vec!["pool"]);
    assert!(Arc::ptr_eq(server.read().pool.as_ref().expect("pool injected"), &pool));

    let replacement = Arc::new(vec!["c".to_string()]);
    env.put_transient("server.pool", Arc::clone(&replacement))?;
    assert!(Arc::ptr_eq(server.read().pool.as_ref().expect("pool refreshed"), &replacement));
    Ok(())
}

#[test]
fn test_default_store_and_silenced_logging() -> Result<()> {
    let config = Arc::new(Configuration::new());
    config.put(&IntSetting::new("server.port"), 7000)?;
    set_default_configuration(Some(Arc::clone(&config)));

    logging::set_level(LogLevel::Debug)?;
    logging::set_disabled(true)?;
    let server = binder::shared(Server::default());
    let report = configure_with_default_configuration(&server).expect("default installed");
    logging::set_disabled(false)?;

    assert!(report.is_complete());
    assert_eq!(server.read().port, 7000);
    assert_eq!(logging::level(), LogLevel::Debug);

    set_default_configuration(None);
    assert!(configure_with_default_configuration(&server).is_none());
    Ok(())
}
