//! Integration tests for waymark-config

use std::env;
use std::fs;
use std::sync::LazyLock;
use waymark_config::*;
use waymark_core::discoverer::resolve_placeholders;
use waymark_core::{
    Handler, HandlerDescriptor, HandlerMethod, MethodDescriptor, ParameterDescriptor,
    PlaceholderResolver, method_on,
};

struct OrderController;

impl OrderController {
    const SHOW: HandlerMethod<Self, (u64,), ()> = HandlerMethod::new("show");
}

impl Handler for OrderController {
    fn descriptor() -> &'static HandlerDescriptor {
        static DESCRIPTOR: LazyLock<HandlerDescriptor> = LazyLock::new(|| {
            HandlerDescriptor::of::<OrderController>()
                .mapping("${api.base:/api}/${api.version}/orders")
                .method(MethodDescriptor::get("show", "/{id}").param(ParameterDescriptor::path("id")))
        });
        &DESCRIPTOR
    }
}

#[test]
fn test_config_manager_with_prefix() {
    let manager = ConfigManager::with_prefix("WAYMARK_IT");

    unsafe {
        env::set_var("WAYMARK_IT_API_VERSION", "v3");
    }

    manager.load_env().unwrap();
    assert_eq!(manager.get_string("api_version").unwrap(), "v3");
    assert_eq!(manager.resolve("api.version").as_deref(), Some("v3"));

    unsafe {
        env::remove_var("WAYMARK_IT_API_VERSION");
    }
}

#[test]
fn test_load_files() {
    let dir = env::temp_dir().join(format!("waymark-config-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    let toml_path = dir.join("app.toml");
    fs::write(&toml_path, "[api]\nversion = \"v2\"\n").unwrap();
    let json_path = dir.join("app.json");
    fs::write(&json_path, r#"{"api": {"version": "v4"}, "region": "eu"}"#).unwrap();

    let manager = ConfigManager::new();
    manager.load_file_auto(&toml_path).unwrap();
    assert_eq!(manager.get_string("api.version").unwrap(), "v2");

    manager.load_file(&json_path, FileFormat::Json).unwrap();
    assert_eq!(manager.get_string("api.version").unwrap(), "v4");
    assert_eq!(manager.get_string("region").unwrap(), "eu");

    assert!(matches!(
        manager.load_file(dir.join("missing.toml"), FileFormat::Toml),
        Err(ConfigError::LoadError(_))
    ));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_placeholder_resolution() {
    let manager = ConfigManager::new();
    manager.set("api.version", "v2").unwrap();

    assert_eq!(
        resolve_placeholders("${api.base:/api}/${api.version}/orders", &manager),
        "/api/v2/orders"
    );
    assert_eq!(resolve_placeholders("/${unknown}/orders", &manager), "/${unknown}/orders");
}

#[test]
fn test_links_with_configured_mappings() {
    let manager = ConfigManager::new();
    manager
        .load_str(
            r#"
            [api]
            base = "/shop"
            version = "v1"

            [waymark]
            base_uri = "https://example.com"
            "#,
            FileFormat::Toml,
        )
        .unwrap();

    let handler = manager.web_handler().unwrap();

    let recording = method_on::<OrderController>(()).invoke(OrderController::SHOW, (12,));
    let link = handler.link_to(&recording).unwrap().with_self_rel();

    assert_eq!(link.href(), "https://example.com/shop/v1/orders/12");
}

#[test]
fn test_configured_handler_uses_placeholder_defaults() {
    let manager = ConfigManager::new();
    manager.set("api", serde_json::json!({ "version": "v7" })).unwrap();

    let handler = manager.web_handler().unwrap();
    let recording = method_on::<OrderController>(()).invoke(OrderController::SHOW, (3,));
    let link = handler.link_to(&recording).unwrap().with_self_rel();

    assert_eq!(link.href(), "/api/v7/orders/3");
    assert_eq!(handler.discoverer().stats().misses(), 1);
}

#[test]
fn test_invalid_link_settings() {
    let manager = ConfigManager::new();
    manager
        .load_str(r#"{"waymark": {"recorder_cache_capacity": 0}}"#, FileFormat::Json)
        .unwrap();

    assert!(matches!(
        manager.link_settings(),
        Err(ConfigError::InvalidSettings(_))
    ));
    assert!(manager.recorder().is_err());
}
