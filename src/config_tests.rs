//! Tests for configuration

#[cfg(test)]
mod tests {
    use super::super::config::*;
    use crate::data::Indicator;
    use crate::error::CrisisError;
    use std::io::Write;

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.lag_horizon, 20);
        assert_eq!(config.crash_threshold, -0.05);
        assert_eq!(config.ensemble_size, 100);
        assert_eq!(config.max_depth, None);
        assert_eq!(config.test_fraction, 0.2);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.decision_threshold, 0.5);
        assert_eq!(
            config.features,
            vec![Indicator::Vix, Indicator::Oil, Indicator::YieldSpread]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_evaluation_preset() {
        let config = TrainingConfig::evaluation();
        assert_eq!(config.ensemble_size, 200);
        assert_eq!(config.max_depth, Some(5));
        assert_eq!(config.features.last(), Some(&Indicator::Gold));
        assert_eq!(config.lag_horizon, 20);
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.data.path, "financial_dataset.csv");
        assert_eq!(config.training, TrainingConfig::default());
        assert_eq!(config.dashboard.port, 8501);
        assert_eq!(config.dashboard.recent_window, 252);
        assert_eq!(config.analyst.fear_level, 30.0);
        assert_eq!(config.collector.start_date.to_string(), "2000-01-01");
        assert_eq!(
            config.collector.optional,
            vec![Indicator::Gold, Indicator::UsdKrw]
        );
    }

    #[test]
    fn test_partial_training_section() {
        let toml_str = r#"
[training]
ensemble_size = 250
max_depth = 6
features = ["vix", "t10y2y", "gold"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.training.ensemble_size, 250);
        assert_eq!(config.training.max_depth, Some(6));
        assert_eq!(
            config.training.features,
            vec![Indicator::Vix, Indicator::YieldSpread, Indicator::Gold]
        );
        assert_eq!(config.training.random_seed, 42);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let cases = [
            TrainingConfig {
                lag_horizon: 0,
                ..TrainingConfig::default()
            },
            TrainingConfig {
                ensemble_size: 0,
                ..TrainingConfig::default()
            },
            TrainingConfig {
                max_depth: Some(0),
                ..TrainingConfig::default()
            },
            TrainingConfig {
                test_fraction: 1.0,
                ..TrainingConfig::default()
            },
            TrainingConfig {
                decision_threshold: 1.5,
                ..TrainingConfig::default()
            },
            TrainingConfig {
                crash_threshold: -1.0,
                ..TrainingConfig::default()
            },
            TrainingConfig {
                features: vec![],
                ..TrainingConfig::default()
            },
            TrainingConfig {
                features: vec![Indicator::Vix, Indicator::Sp500],
                ..TrainingConfig::default()
            },
            TrainingConfig {
                features: vec![Indicator::Vix, Indicator::Vix],
                ..TrainingConfig::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(CrisisError::InvalidConfig(_))),
                "{:?} should be rejected",
                config
            );
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[data]\npath = \"/tmp/indicators.csv\"\n\n[dashboard]\nport = 9000"
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.data.path, "/tmp/indicators.csv");
        assert_eq!(config.dashboard.port, 9000);
        assert_eq!(config.training.ensemble_size, 100);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.dashboard.host, "127.0.0.1");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[training]\ntest_fraction = 1.5").unwrap();
        assert!(matches!(
            Config::load(file.path().to_str().unwrap()),
            Err(CrisisError::InvalidConfig(_))
        ));
    }
}
