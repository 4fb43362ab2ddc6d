use std::fs;
use std::path::{Path, PathBuf};

/// Library code reports failures as typed results; only tests and the
/// binary entry point may unwrap.
const ALLOWED_PANIC_SITES: &[&str] = &["src/main.rs", "src/main_runtime.rs"];

const FORBIDDEN: &[&str] = &[".unwrap()", ".expect(", "process::exit(", "unimplemented!("];

fn collect_rust_files(root: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rust_files(&path, out);
            continue;
        }
        if path.extension().and_then(|s| s.to_str()) == Some("rs") {
            out.push(path);
        }
    }
}

/// Source before the first `#[cfg(test)]` block
fn non_test_section(content: &str) -> &str {
    content
        .find("#[cfg(test)]\nmod tests")
        .map(|idx| &content[..idx])
        .unwrap_or(content)
}

#[test]
fn library_code_does_not_panic_on_errors() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut files = Vec::new();
    collect_rust_files(&repo_root.join("src"), &mut files);
    assert!(!files.is_empty());

    let mut offenders = Vec::new();
    for file in files {
        let rel = file
            .strip_prefix(repo_root)
            .unwrap_or(&file)
            .to_string_lossy()
            .replace('\\', "/");
        if ALLOWED_PANIC_SITES.contains(&rel.as_str()) || rel.ends_with("/mock.rs") {
            continue;
        }
        let content = fs::read_to_string(&file).unwrap_or_default();
        for (idx, line) in non_test_section(&content).lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("//") {
                continue;
            }
            if FORBIDDEN.iter().any(|pattern| trimmed.contains(pattern)) {
                offenders.push(format!("{rel}:{}: {}", idx + 1, trimmed));
            }
        }
    }

    assert!(
        offenders.is_empty(),
        "panicking error handling outside tests:\n{}",
        offenders.join("\n")
    );
}

#[test]
fn default_config_file_matches_builtin_defaults() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let loaded = aqms::AppConfig::load_from(repo_root.join("config")).expect("config loads");
    let builtin = aqms::AppConfig::default();

    assert!(loaded.validate().is_ok());
    assert_eq!(loaded.collector.source_timeout_ms, builtin.collector.source_timeout_ms);
    assert_eq!(loaded.collector.low_cost_calibration, builtin.collector.low_cost_calibration);
    assert_eq!(loaded.validator.pm25_max, builtin.validator.pm25_max);
    assert_eq!(
        loaded.alerting.coordination_threshold_percent,
        builtin.alerting.coordination_threshold_percent
    );
    assert_eq!(loaded.logging.level, builtin.logging.level);
}
