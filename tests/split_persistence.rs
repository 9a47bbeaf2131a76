//! End-to-end tests for split-file persistence
//!
//! A store is saved across several prefix partitions and restored into a
//! fresh store from the files.

use anyhow::Result;
use cfgstore::{
    ColorSetting, Color, Configuration, Environment, IntSetting, PartitionFile, Splittable,
    StringSetting,
};
use tempfile::TempDir;

fn three_entries() -> Result<Configuration> {
    let config = Configuration::new();
    config.put(&StringSetting::new("a.1"), "v1".to_string())?;
    config.put(&StringSetting::new("a.2"), "v2".to_string())?;
    config.put(&StringSetting::new("b.1"), "v3".to_string())?;
    Ok(config)
}

#[test]
fn test_partitions_restore_every_entry() -> Result<()> {
    let dir = TempDir::new()?;
    let files = [
        PartitionFile::new("a.", dir.path().join("a.properties")),
        PartitionFile::new("b.", dir.path().join("b.properties")),
    ];

    let config = three_entries()?;
    config.save_split(&files)?;

    let restored = Configuration::new();
    restored.load_split(&files)?;
    assert_eq!(restored, config);

    let a_only = Configuration::new();
    a_only.load_split(&files[..1])?;
    assert_eq!(a_only.keys(), vec!["a.1".to_string(), "a.2".to_string()]);
    Ok(())
}

#[test]
fn test_load_order_decides_overlapping_keys() -> Result<()> {
    let dir = TempDir::new()?;
    let file_a = PartitionFile::new("a.", dir.path().join("a.properties"));
    let file_b = PartitionFile::new("b.", dir.path().join("b.properties"));
    three_entries()?.save_split(&[file_a.clone(), file_b.clone()])?;

    // b.properties gets a stale copy of a.1
    std::fs::write(file_b.path(), "a.1=from b\nb.1=v3\n")?;

    let b_then_a = Configuration::new();
    b_then_a.load_split(&[file_b.clone(), file_a.clone()])?;
    assert_eq!(b_then_a.get_raw("a.1").as_deref(), Some("v1"));

    let a_then_b = Configuration::new();
    a_then_b.load_split(&[file_a, file_b])?;
    assert_eq!(a_then_b.get_raw("a.1").as_deref(), Some("from b"));
    Ok(())
}

#[test]
fn test_shared_prefix_fans_out() -> Result<()> {
    let dir = TempDir::new()?;
    let primary = PartitionFile::new("a.", dir.path().join("primary.properties"));
    let backup = PartitionFile::new("a.", dir.path().join("backup.properties")).with_comment("backup copy");

    three_entries()?.save_split(&[primary.clone(), backup.clone()])?;

    let primary_text = std::fs::read_to_string(primary.path())?;
    let backup_text = std::fs::read_to_string(backup.path())?;
    assert_eq!(primary_text, "#\na.1=v1\na.2=v2\n");
    assert_eq!(backup_text, "#backup copy\na.1=v1\na.2=v2\n");
    Ok(())
}

#[test]
fn test_loading_ignores_prefixes() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("mixed.properties");
    std::fs::write(&path, "x.1=1\ny.1=2\n")?;

    let config = Configuration::new();
    config.load_split(&[PartitionFile::new("x.", &path)])?;
    assert_eq!(config.len(), 2);
    Ok(())
}

#[test]
fn test_typed_values_survive_split_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let files = [
        PartitionFile::new("window.", dir.path().join("window.properties")),
        PartitionFile::new("theme.", dir.path().join("theme.properties")),
    ];

    let config = Configuration::new();
    config.put(&IntSetting::new("window.width"), 1280)?;
    config.put(&ColorSetting::new("theme.accent"), Color::from_rgba(200, 100, 50, 128))?;
    config.save_split(&files)?;

    let restored = Configuration::new();
    restored.load_split(&files)?;
    assert_eq!(restored.get(&IntSetting::new("window.width"))?, Some(1280));
    assert_eq!(
        restored.get(&ColorSetting::new("theme.accent"))?,
        Some(Color::from_rgba(200, 100, 50, 128))
    );
    Ok(())
}

#[test]
fn test_environment_split_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let files = [
        PartitionFile::new("a.", dir.path().join("a.env")),
        PartitionFile::new("b.", dir.path().join("b.env")),
        PartitionFile::new("empty.", dir.path().join("empty.env")),
    ];

    let env = Environment::new();
    env.put_persistent("a.1", "v1".to_string())?;
    env.put_persistent("a.2", 2_u32)?;
    env.put_persistent("b.1", vec!["x".to_string(), "y".to_string()])?;
    env.save_split(&files)?;

    assert_eq!(std::fs::read(files[2].path())?, vec![0, 0, 0, 0]);

    let restored = Environment::new();
    restored.load_split(&files)?;
    assert_eq!(restored.keys(), env.keys());
    assert_eq!(restored.get_as::<u32>("a.2"), Some(2));
    assert_eq!(
        restored.get_as::<Vec<String>>("b.1"),
        Some(vec!["x".to_string(), "y".to_string()])
    );
    Ok(())
}
