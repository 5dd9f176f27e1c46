use visage_engine::probe_library;
use visage_readiness::{checks, CheckOutcome, Validator};

use crate::config::Config;

/// Builds the validator with the service's checks, in reporting order.
pub fn standard_checks(config: &Config) -> Validator {
    let mut validator = Validator::new();

    validator.register("Runtime", true, || checks::runtime(env!("CARGO_PKG_VERSION")));

    for library in &config.required_libraries {
        let name = library.clone();
        validator.register(format!("Library {library}"), true, move || {
            checks::library_loadable(&name)
        });
    }

    let source = config.source.clone();
    validator.register("Config File", true, move || match &source {
        Some(path) => {
            let parsed = Config::load(Some(path))?;
            Ok(CheckOutcome::pass(format!(
                "{} ({} accepted extensions)",
                path.display(),
                parsed.accepted_extensions.len()
            )))
        }
        None => Ok(CheckOutcome::pass("no config file, using defaults")),
    });

    let temp_dir = config.temp_dir.clone();
    validator.register("Temp Directory", true, move || checks::writable_dir(&temp_dir));

    let engine = config.engine.clone();
    validator.register("Engine Module", false, move || match probe_library(&engine) {
        Ok(detail) => Ok(CheckOutcome::pass(detail)),
        Err(e) => Ok(CheckOutcome::fail(e.to_string())),
    });

    validator.register("Accelerator Libraries", false, || {
        checks::library_on_search_path("libnvinfer.so", checks::SYSTEM_LIBRARY_DIRS)
    });

    let model_path = config.engine.model_path.clone();
    validator.register("Model Path", false, move || checks::file_exists("model", &model_path));

    validator
}

#[cfg(test)]
mod tests {
    use super::*;
    use visage_readiness::CheckStatus;

    #[test]
    fn test_check_order() {
        let config = Config {
            required_libraries: vec!["liba.so".into(), "libb.so".into()],
            ..Default::default()
        };
        let names: Vec<_> = standard_checks(&config)
            .checks()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "Runtime",
                "Library liba.so",
                "Library libb.so",
                "Config File",
                "Temp Directory",
                "Engine Module",
                "Accelerator Libraries",
                "Model Path",
            ]
        );
    }

    #[test]
    fn test_classification() {
        let v = standard_checks(&Config::default());
        let fatal: Vec<_> = v.checks().iter().map(|c| (c.name().to_string(), c.is_fatal())).collect();
        assert!(fatal.iter().any(|(n, f)| n == "Temp Directory" && *f));
        assert!(fatal.iter().any(|(n, f)| n == "Engine Module" && !*f));
        assert!(fatal.iter().any(|(n, f)| n == "Model Path" && !*f));
    }

    #[test]
    fn test_missing_engine_only_warns() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            temp_dir: dir.path().join("scratch"),
            required_libraries: Vec::new(),
            ..Default::default()
        };
        config.engine.library = "/nonexistent/libaudio2face.so".into();
        config.engine.model_path = dir.path().join("missing/model.json");

        let verdict = standard_checks(&config).run_all();
        let engine = verdict.results.iter().find(|r| r.name == "Engine Module").unwrap();
        assert_eq!(engine.status, CheckStatus::Warning);
        let model = verdict.results.iter().find(|r| r.name == "Model Path").unwrap();
        assert_eq!(model.status, CheckStatus::Warning);
        let temp = verdict.results.iter().find(|r| r.name == "Temp Directory").unwrap();
        assert_eq!(temp.status, CheckStatus::Passed);
        assert_eq!(verdict.failed, usize::from(!cfg!(target_os = "linux")));
    }

    #[test]
    fn test_missing_required_library_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            temp_dir: dir.path().to_path_buf(),
            required_libraries: vec!["libvisage-required-missing.so".into()],
            ..Default::default()
        };
        let verdict = standard_checks(&config).run_all();
        assert!(!verdict.healthy);
        let lib = verdict
            .results
            .iter()
            .find(|r| r.name == "Library libvisage-required-missing.so")
            .unwrap();
        assert_eq!(lib.status, CheckStatus::Failed);
    }

    #[test]
    fn test_broken_config_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "port: 1\n").unwrap();
        let config = Config {
            source: Some(path.clone()),
            temp_dir: dir.path().to_path_buf(),
            required_libraries: Vec::new(),
            ..Default::default()
        };
        let validator = standard_checks(&config);

        std::fs::write(&path, "port: [broken\n").unwrap();
        let verdict = validator.run_all();
        let check = verdict.results.iter().find(|r| r.name == "Config File").unwrap();
        assert_eq!(check.status, CheckStatus::Failed);
        assert!(check.detail.starts_with("error during check:"));
    }
}
