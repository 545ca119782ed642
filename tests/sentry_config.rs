use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::{Builder, NamedTempFile};

use cat_sentry::config::SentryConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "CAT_SENTRY_CONFIG",
        "CAT_SENTRY_INTERVAL_SECS",
        "CAT_SENTRY_TARGET_CLASS",
        "CAT_SENTRY_MODEL_PATH",
        "CAT_SENTRY_CAPTURE_DIR",
        "CAT_SENTRY_CAPTURE_TIMEOUT_SECS",
        "CAT_SENTRY_LOG_DIR",
        "DISCORD_WEBHOOK_URL",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_only_need_a_webhook() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    std::env::set_var("DISCORD_WEBHOOK_URL", "https://discord.com/api/webhooks/1/abc");

    let cfg = SentryConfig::load().expect("load config");

    assert_eq!(cfg.interval, Duration::from_secs(30));
    assert_eq!(cfg.target_class, 15);
    assert_eq!(cfg.log_dir, PathBuf::from("logs"));
    assert_eq!(cfg.layout.all_dir, PathBuf::from("captures/all"));
    assert_eq!(cfg.layout.positive_dir, PathBuf::from("captures/cats"));
    assert_eq!(cfg.capture.program, PathBuf::from("fswebcam"));
    assert_eq!(cfg.capture.resolution, "640x480");
    assert_eq!(cfg.model.path, PathBuf::from("yolo11s.onnx"));
    assert_eq!(cfg.webhook.message, "cat detected");
    assert_eq!(cfg.webhook.timeout, Duration::from_secs(30));

    clear_env();
}

#[test]
fn missing_webhook_is_fatal() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let err = SentryConfig::load().unwrap_err();
    assert!(err.to_string().contains("DISCORD_WEBHOOK_URL must be set"), "{}", err);

    std::env::set_var("DISCORD_WEBHOOK_URL", "   ");
    assert!(SentryConfig::load().is_err());

    clear_env();
}

#[test]
fn loads_json_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "interval_secs": 45,
        "target_class": 16,
        "log_dir": "/var/log/sentry",
        "capture": {
            "program": "/usr/local/bin/fswebcam",
            "resolution": "1280x720",
            "timeout_secs": 20
        },
        "storage": {
            "root": "/srv/captures",
            "positive_dir": "/srv/positives"
        },
        "model": {
            "path": "models/yolo11n.onnx",
            "input_size": 320,
            "confidence_threshold": 0.4
        },
        "webhook": {
            "url": "https://hooks.example.com/from-file",
            "message": "dog detected"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("CAT_SENTRY_CONFIG", file.path());
    std::env::set_var("CAT_SENTRY_INTERVAL_SECS", "60");
    std::env::set_var("DISCORD_WEBHOOK_URL", "https://hooks.example.com/from-env");

    let cfg = SentryConfig::load().expect("load config");

    assert_eq!(cfg.interval, Duration::from_secs(60));
    assert_eq!(cfg.target_class, 16);
    assert_eq!(cfg.log_dir, PathBuf::from("/var/log/sentry"));
    assert_eq!(cfg.capture.program, PathBuf::from("/usr/local/bin/fswebcam"));
    assert_eq!(cfg.capture.resolution, "1280x720");
    assert_eq!(cfg.capture.timeout, Duration::from_secs(20));
    assert_eq!(cfg.layout.all_dir, PathBuf::from("/srv/captures/all"));
    assert_eq!(cfg.layout.positive_dir, PathBuf::from("/srv/positives"));
    assert_eq!(cfg.model.path, PathBuf::from("models/yolo11n.onnx"));
    assert_eq!(cfg.model.params.input_size, 320);
    assert_eq!(cfg.model.params.confidence_threshold, 0.4);
    assert_eq!(cfg.model.params.iou_threshold, 0.45);
    assert_eq!(cfg.webhook.url, "https://hooks.example.com/from-env");
    assert_eq!(cfg.webhook.message, "dog detected");

    clear_env();
}

#[test]
fn loads_toml_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r#"
interval_secs = 10

[webhook]
url = "http://127.0.0.1:8080/hook"
timeout_secs = 5
"#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");
    std::env::set_var("CAT_SENTRY_CAPTURE_DIR", "/tmp/sentry-captures");

    let cfg = SentryConfig::load_from(Some(file.path())).expect("load config");

    assert_eq!(cfg.interval, Duration::from_secs(10));
    assert_eq!(cfg.webhook.url, "http://127.0.0.1:8080/hook");
    assert_eq!(cfg.webhook.timeout, Duration::from_secs(5));
    assert_eq!(cfg.layout.all_dir, PathBuf::from("/tmp/sentry-captures/all"));
    assert_eq!(cfg.layout.positive_dir, PathBuf::from("/tmp/sentry-captures/cats"));

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    std::env::set_var("DISCORD_WEBHOOK_URL", "https://discord.com/api/webhooks/1/abc");

    std::env::set_var("CAT_SENTRY_INTERVAL_SECS", "0");
    assert!(SentryConfig::load().is_err());
    std::env::set_var("CAT_SENTRY_INTERVAL_SECS", "soon");
    assert!(SentryConfig::load().is_err());
    std::env::remove_var("CAT_SENTRY_INTERVAL_SECS");

    std::env::set_var("DISCORD_WEBHOOK_URL", "ftp://example.com/hook");
    assert!(SentryConfig::load().is_err());
    std::env::set_var("DISCORD_WEBHOOK_URL", "https://discord.com/api/webhooks/1/abc");

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{ "capture": { "resolution": "wide" } }"#).unwrap();
    assert!(SentryConfig::load_from(Some(file.path())).is_err());

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{ "intervall_secs": 5 }"#).unwrap();
    let err = SentryConfig::load_from(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("invalid config file"), "{}", err);

    clear_env();
}
