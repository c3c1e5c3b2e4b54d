use eftem_core::consts::DEFAULT_EPSILON;
use eftem_core::image::ResultKind;
use eftem_core::pipeline::config::MapConfig;
use eftem_core::pipeline::Stage;

// ---------------------------------------------------------------------------
// MapConfig
// ---------------------------------------------------------------------------

#[test]
fn test_map_config_default() {
    let config = MapConfig::default();
    assert_eq!(config.epsilon, DEFAULT_EPSILON);
    assert!(config.edge_energy_loss.is_none());
    assert!(config.workers.is_none());
}

#[test]
fn test_map_config_toml_roundtrip() {
    let config = MapConfig {
        epsilon: 1e-4,
        edge_energy_loss: Some(532.0),
        workers: Some(3),
    };
    let text = toml::to_string_pretty(&config).unwrap();
    let parsed: MapConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_map_config_missing_fields_use_defaults() {
    let parsed: MapConfig = toml::from_str("edge_energy_loss = 284.0\n").unwrap();
    assert_eq!(parsed.epsilon, DEFAULT_EPSILON);
    assert_eq!(parsed.edge_energy_loss, Some(284.0));
    assert!(parsed.workers.is_none());

    let empty: MapConfig = toml::from_str("").unwrap();
    assert_eq!(empty, MapConfig::default());
}

#[test]
fn test_map_config_context_uses_worker_count() {
    let config = MapConfig {
        workers: Some(3),
        ..MapConfig::default()
    };
    assert_eq!(config.context().unwrap().workers(), 3);

    let config = MapConfig {
        workers: Some(0),
        ..MapConfig::default()
    };
    assert_eq!(config.context().unwrap().workers(), 1);
}

#[test]
fn test_map_config_predicts_edge_between_last_two_images() {
    let config = MapConfig::default();
    assert_eq!(config.resolve_edge(&[300.0, 340.0, 380.0]), Some(367.0));
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[test]
fn test_stage_display() {
    assert_eq!(format!("{}", Stage::Mle), "Power law fit (MLE)");
    assert_eq!(format!("{}", Stage::Snr), "Signal to noise ratio");
    assert_eq!(format!("{}", Stage::Chi2), "Chi-square");
}

#[test]
fn test_stage_order() {
    let mut stage = Stage::Mle;
    let mut visited = Vec::new();
    while stage != Stage::Done {
        visited.push(stage);
        stage = stage.next();
    }
    assert_eq!(visited, Stage::COMPUTING.to_vec());
    assert_eq!(Stage::Done.next(), Stage::Done);
}

#[test]
fn test_result_kind_display() {
    assert_eq!(format!("{}", ResultKind::RelativeBackground), "Relative background");
    assert_eq!(format!("{}", ResultKind::Snr), "SNR");
}
