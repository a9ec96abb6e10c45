// ABOUTME: Integration tests for environment-based server configuration
// ABOUTME: Serialized because they mutate process environment variables
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use gympulse::config::{Environment, LogLevel, ServerConfig};
use serial_test::serial;

const VARS: &[&str] = &[
    "GYMPULSE_ENV",
    "GYMPULSE_PROVIDER_SECRET",
    "HTTP_PORT",
    "DATABASE_URL",
    "TOKEN_CACHE_SIZE",
    "MEDIA_ROOT",
    "LOG_LEVEL",
];

fn clear_vars() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_apply_when_nothing_is_set() {
    clear_vars();

    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.http_port, 8081);
    assert_eq!(config.database_url, "sqlite:./data/gympulse.db");
    assert_eq!(config.token_cache_size, 1024);
    assert_eq!(config.environment, Environment::Development);
    assert_eq!(config.log_level, LogLevel::Info);
    // Development falls back to an insecure local secret.
    assert!(!config.provider_secret.is_empty());
}

#[test]
#[serial]
fn explicit_variables_override_defaults() {
    clear_vars();
    std::env::set_var("GYMPULSE_ENV", "production");
    std::env::set_var("GYMPULSE_PROVIDER_SECRET", "prod-secret");
    std::env::set_var("HTTP_PORT", "9090");
    std::env::set_var("LOG_LEVEL", "debug");

    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.http_port, 9090);
    assert_eq!(config.environment, Environment::Production);
    assert_eq!(config.provider_secret, "prod-secret");
    assert_eq!(config.log_level, LogLevel::Debug);

    clear_vars();
}

#[test]
#[serial]
fn production_without_a_secret_fails() {
    clear_vars();
    std::env::set_var("GYMPULSE_ENV", "production");

    assert!(ServerConfig::from_env().is_err());

    clear_vars();
}

#[test]
#[serial]
fn bad_port_value_is_an_error() {
    clear_vars();
    std::env::set_var("HTTP_PORT", "not-a-port");

    assert!(ServerConfig::from_env().is_err());

    clear_vars();
}
