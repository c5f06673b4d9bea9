use super::*;
use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &[
    "PORT",
    "MANIFEST_SOURCE",
    "PUBLIC_DIR",
    "THUMBNAILS_DIR",
    "BOARD_HOST",
    "BOARD_FILE",
    "BOARD_API_BASE_URL",
    "BOARD_ID",
    "BOARD_TOKEN_ENV",
    "PLACEMENT_OFFSET_X",
    "PLACEMENT_OFFSET_Y",
    "PLACEMENT_SETTLE_MS",
    "VERBOSE_LOGGING",
    "HTTP_TIMEOUT_SECS",
    "HTTP_CONNECT_TIMEOUT_SECS",
    "TEST_BOARD_TOKEN",
];

/// # Safety
/// Callers hold `ENV_LOCK` so no other config test touches the environment.
unsafe fn clear_env() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

#[test]
fn from_env_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe { clear_env() };

    let cfg = PluginConfig::from_env().unwrap();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.manifest_source, ManifestSource::File(PathBuf::from(DEFAULT_MANIFEST_SOURCE)));
    assert_eq!(cfg.public_dir, PathBuf::from(DEFAULT_PUBLIC_DIR));
    assert_eq!(cfg.thumbnails_dir, PathBuf::from(DEFAULT_THUMBNAILS_DIR));
    assert_eq!(cfg.host, HostConfig::Memory { board_file: None });
    assert_eq!(cfg.staging_offset, Point::new(10_000.0, 0.0));
    assert_eq!(cfg.placement_settle_ms, 1500);
    assert!(!cfg.verbose_logging);
    assert_eq!(
        cfg.timeouts,
        HttpTimeouts { request_secs: DEFAULT_HTTP_TIMEOUT_SECS, connect_secs: DEFAULT_HTTP_CONNECT_TIMEOUT_SECS }
    );
}

#[test]
fn from_env_parses_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_env();
        std::env::set_var("PORT", "8080");
        std::env::set_var("MANIFEST_SOURCE", "https://plugin.test/plantilles.json");
        std::env::set_var("BOARD_FILE", "/tmp/board.json");
        std::env::set_var("PLACEMENT_OFFSET_X", "-250.5");
        std::env::set_var("PLACEMENT_SETTLE_MS", "0");
        std::env::set_var("VERBOSE_LOGGING", "true");
        std::env::set_var("HTTP_TIMEOUT_SECS", "5");
    }

    let cfg = PluginConfig::from_env().unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.manifest_source, ManifestSource::Url("https://plugin.test/plantilles.json".into()));
    assert_eq!(cfg.host, HostConfig::Memory { board_file: Some(PathBuf::from("/tmp/board.json")) });
    assert_eq!(cfg.staging_offset, Point::new(-250.5, 0.0));
    assert_eq!(cfg.timeouts.request(), Duration::from_secs(5));

    let opts = cfg.placement_options();
    assert!(opts.verbose_logging);
    assert_eq!(opts.children_settle, Duration::ZERO);
    assert_eq!(opts.frame_settle, PlacementOptions::default().frame_settle);

    unsafe { clear_env() };
}

#[test]
fn unparseable_numbers_fall_back_to_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_env();
        std::env::set_var("PORT", "eighty");
        std::env::set_var("VERBOSE_LOGGING", "yes");
    }

    let cfg = PluginConfig::from_env().unwrap();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert!(!cfg.verbose_logging);

    unsafe { clear_env() };
}

#[test]
fn rest_host_requires_board_and_token() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_env();
        std::env::set_var("BOARD_HOST", "rest");
    }
    assert_eq!(PluginConfig::from_env().unwrap_err(), ConfigError::MissingVar { var: "BOARD_ID".into() });

    unsafe {
        std::env::set_var("BOARD_ID", "uXjVabc=");
        std::env::set_var("BOARD_TOKEN_ENV", "TEST_BOARD_TOKEN");
    }
    assert_eq!(PluginConfig::from_env().unwrap_err(), ConfigError::MissingVar { var: "TEST_BOARD_TOKEN".into() });

    unsafe {
        std::env::set_var("TEST_BOARD_TOKEN", "secret");
        std::env::set_var("BOARD_API_BASE_URL", "https://board.test/v2/");
    }
    let cfg = PluginConfig::from_env().unwrap();
    assert_eq!(
        cfg.host,
        HostConfig::Rest(RestHostConfig {
            base_url: "https://board.test/v2".into(),
            board_id: "uXjVabc=".into(),
            token: "secret".into(),
        })
    );

    unsafe { clear_env() };
}

#[test]
fn unknown_board_host_errors() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_env();
        std::env::set_var("BOARD_HOST", "sqlite");
    }
    let err = PluginConfig::from_env().unwrap_err();
    assert_eq!(err, ConfigError::Invalid { var: "BOARD_HOST".into(), value: "sqlite".into() });
    unsafe { clear_env() };
}
