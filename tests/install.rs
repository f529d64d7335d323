mod common;

use algoinstall_lib::external::ServiceStatus;
use algoinstall_lib::installer::telemetry::TelemetryError;
use algoinstall_lib::installer::{InstallEvent, InstallStep, Installer, StepError};
use assert_fs::prelude::*;
use assert_fs::TempDir;
use common::{options_in, settings_in, Host};
use predicates::prelude::*;
use serde_json::Value;

fn prepared_dir() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    temp_dir.child("home").create_dir_all().unwrap();
    temp_dir
}

fn read_config(temp_dir: &TempDir) -> Value {
    let text = std::fs::read_to_string(temp_dir.child("data").child("config.json").path()).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
pub fn fresh_install_configures_and_starts_the_node() {
    let temp_dir = prepared_dir();
    let host = Host::default();
    let installer = Installer::new(
        settings_in(temp_dir.path()),
        options_in(temp_dir.path()),
        host.collaborators(),
    );

    installer.run().unwrap();

    let config = read_config(&temp_dir);
    assert_eq!(config["Archival"], Value::Bool(false));
    assert_eq!(config["DNSBootstrapID"], "testnet.algorand.network");
    assert_eq!(config["GossipFanout"], 4);
    assert_eq!(config["IncomingConnectionsLimit"], 2400);

    let data_dir = temp_dir.child("data");
    data_dir
        .child("genesis.json")
        .assert(predicate::str::contains("testnet-v1.0"));
    data_dir
        .child("kmd-v0.5")
        .child("kmd_config.json")
        .assert(predicate::path::exists());
    data_dir
        .child("logging.config")
        .assert(predicate::str::contains("\"Enable\": false"));
    temp_dir
        .child("home")
        .child(".algorand")
        .child("logging.config")
        .assert(predicate::path::exists());
    temp_dir
        .child("home")
        .child(".bashrc")
        .assert(predicate::str::contains("export ALGORAND_DATA="));
    temp_dir
        .child("install")
        .child("installer_config.json")
        .assert(predicate::str::contains("\"network\": \"testnet\""));

    let calls = host.calls();
    let position = |call: &str| {
        calls
            .iter()
            .position(|c| c == call)
            .unwrap_or_else(|| panic!("`{}` not called in {:?}", call, calls))
    };
    assert!(position("apt install algorand-devtools") > position("apt update"));
    assert!(position("install-unit algorand") < position("enable algorand"));
    assert!(position("enable algorand") < position("start algorand"));
    assert!(position("start algorand") < position("telemetry disable"));
    assert!(position("telemetry disable") < position("restart algorand"));
}

#[test]
pub fn relay_install_uses_relay_defaults_and_is_archival() {
    let temp_dir = prepared_dir();
    let host = Host::default();
    let mut settings = settings_in(temp_dir.path());
    settings.relay = true;
    let installer = Installer::new(settings, options_in(temp_dir.path()), host.collaborators());
    assert!(installer.settings().archival);

    installer.run().unwrap();

    let config = read_config(&temp_dir);
    assert_eq!(config["Archival"], Value::Bool(true));
    assert_eq!(config["NetAddress"], ":4160");
    assert_eq!(config["IncomingConnectionsLimit"], 10000);
}

#[test]
pub fn existing_config_settings_are_kept() {
    let temp_dir = prepared_dir();
    temp_dir
        .child("data")
        .child("config.json")
        .write_str(r#"{ "EndpointAddress": "0.0.0.0:8080", "CustomFlag": 7 }"#)
        .unwrap();
    let host = Host::default();
    let installer = Installer::new(
        settings_in(temp_dir.path()),
        options_in(temp_dir.path()),
        host.collaborators(),
    );

    installer.run().unwrap();

    let config = read_config(&temp_dir);
    assert_eq!(config["EndpointAddress"], "0.0.0.0:8080");
    assert_eq!(config["CustomFlag"], 7);
}

#[test]
pub fn failed_essential_dependency_stops_the_run() {
    let temp_dir = prepared_dir();
    let host = Host {
        failing_package: Some("curl"),
        ..Default::default()
    };
    let installer = Installer::new(
        settings_in(temp_dir.path()),
        options_in(temp_dir.path()),
        host.collaborators(),
    );

    let error = installer.run().unwrap_err();

    assert_eq!(error.step, InstallStep::InstallDependencies);
    assert!(matches!(error.source, StepError::External(_)));
    temp_dir
        .child("data")
        .child("config.json")
        .assert(predicate::path::missing());
    assert!(!host.calls().iter().any(|call| call.starts_with("start")));
}

#[test]
pub fn failed_optional_dependency_is_only_a_warning() {
    let temp_dir = prepared_dir();
    let host = Host {
        failing_package: Some("jq"),
        ..Default::default()
    };
    let (sender, receiver) = std::sync::mpsc::channel();
    let installer = Installer::new(
        settings_in(temp_dir.path()),
        options_in(temp_dir.path()),
        host.collaborators(),
    )
    .with_events(sender);

    assert!(installer.run_installation());
    drop(installer);

    let warnings: Vec<String> = receiver
        .iter()
        .filter_map(|event| match event {
            InstallEvent::Warning(message) => Some(message),
            _ => None,
        })
        .collect();
    assert!(warnings.iter().any(|w| w.contains("jq")));
    assert!(warnings.iter().any(|w| w.contains("port 8080")));
}

#[test]
pub fn unmet_system_requirements_fail_the_checks_step() {
    let temp_dir = prepared_dir();
    let host = Host {
        system_ok: false,
        ..Default::default()
    };
    let installer = Installer::new(
        settings_in(temp_dir.path()),
        options_in(temp_dir.path()),
        host.collaborators(),
    );

    let error = installer.run().unwrap_err();

    assert_eq!(error.step, InstallStep::RunChecks);
    assert!(host.calls().is_empty());
}

#[test]
pub fn telemetry_status_must_confirm_the_change() {
    let temp_dir = prepared_dir();
    let host = Host {
        telemetry_status: "Remote logging is enabled".to_owned(),
        ..Default::default()
    };
    let installer = Installer::new(
        settings_in(temp_dir.path()),
        options_in(temp_dir.path()),
        host.collaborators(),
    );

    let error = installer.run().unwrap_err();

    assert_eq!(error.step, InstallStep::ConfigureTelemetry);
    assert!(matches!(
        error.source,
        StepError::Telemetry(TelemetryError::UnexpectedStatus { .. })
    ));
    assert!(!host.calls().contains(&"restart algorand".to_owned()));
}

#[test]
pub fn enabled_telemetry_names_the_node() {
    let temp_dir = prepared_dir();
    let host = Host {
        telemetry_status: "Remote logging is currently enabled".to_owned(),
        ..Default::default()
    };
    let mut settings = settings_in(temp_dir.path());
    settings.telemetry = true;
    let installer = Installer::new(settings, options_in(temp_dir.path()), host.collaborators());

    installer.run().unwrap();

    assert!(host.calls().contains(&"telemetry name node-1".to_owned()));
    assert_eq!(read_config(&temp_dir)["EnableTelemetry"], Value::Bool(true));
    temp_dir
        .child("data")
        .child("logging.config")
        .assert(predicate::str::contains("\"Name\": \"node-1\""));
}

#[test]
pub fn node_must_be_running_after_the_restart() {
    let temp_dir = prepared_dir();
    let host = Host {
        service_status: ServiceStatus::Stopped,
        ..Default::default()
    };
    let installer = Installer::new(
        settings_in(temp_dir.path()),
        options_in(temp_dir.path()),
        host.collaborators(),
    );

    let error = installer.run().unwrap_err();

    assert_eq!(error.step, InstallStep::ConfigureTelemetry);
    assert!(matches!(
        error.source,
        StepError::Telemetry(TelemetryError::NotRunning {
            status: ServiceStatus::Stopped
        })
    ));
}

#[test]
pub fn spawned_installation_reports_every_step() {
    let temp_dir = prepared_dir();
    let host = Host::default();
    let handle = Installer::new(
        settings_in(temp_dir.path()),
        options_in(temp_dir.path()),
        host.collaborators(),
    )
    .spawn();

    let events: Vec<InstallEvent> = handle.events.iter().collect();
    assert!(handle.wait());

    let started: Vec<InstallStep> = events
        .iter()
        .filter_map(|event| match event {
            InstallEvent::StepStarted(step) => Some(*step),
            _ => None,
        })
        .collect();
    assert_eq!(started, InstallStep::ALL.to_vec());
    assert_eq!(events.last(), Some(&InstallEvent::Done));
}

#[test]
pub fn spawned_failure_is_reported_with_its_step() {
    let temp_dir = prepared_dir();
    let host = Host {
        failing_package: Some("algorand-devtools"),
        ..Default::default()
    };
    let handle = Installer::new(
        settings_in(temp_dir.path()),
        options_in(temp_dir.path()),
        host.collaborators(),
    )
    .spawn();

    let events: Vec<InstallEvent> = handle.events.iter().collect();
    assert!(!handle.wait());

    match events.last() {
        Some(InstallEvent::Failed { step, message }) => {
            assert_eq!(*step, InstallStep::InstallBinaries);
            assert!(message.contains("algorand-devtools"));
        }
        other => panic!("unexpected last event {:?}", other),
    }
}
