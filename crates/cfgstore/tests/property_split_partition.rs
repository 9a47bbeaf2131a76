//! Property-based tests for split-file persistence
//! Each file holds exactly the entries matching its prefix, and loading every
//! file restores the covered entries.

use std::collections::BTreeMap;

use cfgstore::{Configuration, Environment, PartitionFile, Splittable, StringSetting};
use proptest::prelude::*;
use tempfile::TempDir;

const PREFIXES: [&str; 3] = ["app.", "net.", "ui."];

/// Strategy for entries spread over the known prefixes plus strays
fn entries_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    let key = (prop::sample::select(vec!["app.", "net.", "ui.", "misc."]), "[a-z]{1,8}")
        .prop_map(|(prefix, name)| format!("{}{}", prefix, name));
    prop::collection::btree_map(key, "[a-zA-Z0-9 =:#!]{0,16}", 0..30)
}

fn partitions(dir: &TempDir, extension: &str) -> Vec<PartitionFile> {
    PREFIXES
        .iter()
        .map(|prefix| {
            let path = dir.path().join(format!("{}{}", prefix.trim_end_matches('.'), extension));
            PartitionFile::new(*prefix, path).with_comment(format!("entries under {}", prefix))
        })
        .collect()
}

fn covered(key: &str) -> bool {
    PREFIXES.iter().any(|prefix| key.starts_with(prefix))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn prop_settings_partition_correctness(entries in entries_strategy()) {
        let dir = TempDir::new().expect("Should create temp directory");
        let files = partitions(&dir, ".properties");

        let config = Configuration::new();
        for (key, value) in &entries {
            config.put(&StringSetting::new(key.clone()), value.clone()).unwrap();
        }
        config.save_split(&files).unwrap();

        for file in &files {
            let single = Configuration::new();
            single.load_split(std::slice::from_ref(file)).unwrap();
            prop_assert!(single.keys().iter().all(|key| key.starts_with(file.prefix())));
            let expected = entries.keys().filter(|key| key.starts_with(file.prefix())).count();
            prop_assert_eq!(single.len(), expected);
        }

        let restored = Configuration::new();
        restored.load_split(&files).unwrap();
        let expected: Vec<String> = entries.keys().filter(|key| covered(key)).cloned().collect();
        prop_assert_eq!(restored.keys(), expected);
        for key in restored.keys() {
            let raw_61 = restored.get_raw(&key);
            prop_assert_eq!(raw_61.as_ref(), entries.get(&key));
        }
    }

    #[test]
    fn prop_environment_partition_correctness(entries in entries_strategy()) {
        let dir = TempDir::new().expect("Should create temp directory");
        let files = partitions(&dir, ".env");

        let env = Environment::new();
        for (key, value) in &entries {
            env.put_persistent(key.clone(), value.clone()).unwrap();
        }
        env.save_split(&files).unwrap();

        let restored = Environment::new();
        restored.load_split(&files).unwrap();

        let expected: Vec<String> = entries.keys().filter(|key| covered(key)).cloned().collect();
        prop_assert_eq!(restored.keys(), expected);
        for key in restored.keys() {
            let raw_82 = restored.get_as::<String>(&key);
            prop_assert_eq!(raw_82.as_ref(), entries.get(&key));
        }
    }

    #[test]
    fn prop_later_file_wins(shared_keys in prop::collection::btree_set("[a-z]{1,6}", 1..10)) {
        let dir = TempDir::new().expect("Should create temp directory");
        let first = PartitionFile::new("", dir.path().join("first.properties"));
        let second = PartitionFile::new("", dir.path().join("second.properties"));

        for (file, value) in [(&first, "first"), (&second, "second")] {
            let config = Configuration::new();
            for key in &shared_keys {
                config.put(&StringSetting::new(key.clone()), value.to_string()).unwrap();
            }
            config.save_split(std::slice::from_ref(file)).unwrap();
        }

        let forward = Configuration::new();
        forward.load_split(&[first.clone(), second.clone()]).unwrap();
        let backward = Configuration::new();
        backward.load_split(&[second, first]).unwrap();

        for key in &shared_keys {
            let raw_106 = forward.get_raw(key);
            prop_assert_eq!(raw_106.as_deref(), Some("second"));
            let raw_107 = backward.get_raw(key);
            prop_assert_eq!(raw_107.as_deref(), Some("first"));
        }
    }
}
