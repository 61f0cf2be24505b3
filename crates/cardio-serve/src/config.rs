//! YAML configuration loading for the inference service.

use cardio_core::ServeConfig;
use std::path::Path;

/// Load a [`ServeConfig`] from a YAML file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn load_config(path: &Path) -> anyhow::Result<ServeConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
    let config: ServeConfig = serde_yaml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {}", e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_yaml(yaml: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_a_full_config() {
        let f = write_yaml(
            "listen_addr: \"127.0.0.1:9000\"\nartifact_path: \"models/other.json\"\n",
        );
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.artifact_path, "models/other.json");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let f = write_yaml("listen_addr: \"127.0.0.1:9000\"\n");
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.artifact_path, "models/artifacts/random_forest_final.json");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/serve.yaml")).is_err());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let f = write_yaml("listen_addr: [not: closed");
        assert!(load_config(f.path()).is_err());
    }
}
