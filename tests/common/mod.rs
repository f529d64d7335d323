#![allow(dead_code)]

use algoinstall_lib::external::{
    self, AptRepository, Diagnostics, Fetch, PackageManager, RequirementsCheck, ServiceManager,
    ServiceStatus,
};
use algoinstall_lib::installer::{Collaborators, InstallOptions, InstallSettings};
use algoinstall_lib::network::Network;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const GENESIS: &str = r#"{ "network": "testnet-v1.0", "alloc": [] }"#;

/// Every call made to the doubles, in order.
pub type Calls = Arc<Mutex<Vec<String>>>;

fn record(calls: &Calls, call: String) {
    calls.lock().unwrap().push(call);
}

pub fn failure(what: &str) -> external::Error {
    external::Error::Requirement(what.to_owned())
}

pub struct FakePackages {
    pub calls: Calls,
    pub failing_package: Option<&'static str>,
}

impl PackageManager for FakePackages {
    fn update_index(&self) -> Result<(), external::Error> {
        record(&self.calls, "apt update".to_owned());
        Ok(())
    }

    fn is_installed(&self, _package: &str) -> bool {
        false
    }

    fn install(&self, packages: &[&str]) -> Result<(), external::Error> {
        record(&self.calls, format!("apt install {}", packages.join(" ")));
        match self.failing_package {
            Some(failing) if packages.contains(&failing) => Err(failure(failing)),
            _ => Ok(()),
        }
    }

    fn add_repository(&self, repository: &AptRepository) -> Result<(), external::Error> {
        record(&self.calls, format!("apt add-repository {}", repository.source));
        Ok(())
    }
}

pub struct FakeServices {
    pub calls: Calls,
    pub status: ServiceStatus,
}

impl ServiceManager for FakeServices {
    fn start(&self, service: &str) -> Result<(), external::Error> {
        record(&self.calls, format!("start {}", service));
        Ok(())
    }

    fn stop(&self, service: &str) -> Result<(), external::Error> {
        record(&self.calls, format!("stop {}", service));
        Ok(())
    }

    fn restart(&self, service: &str) -> Result<(), external::Error> {
        record(&self.calls, format!("restart {}", service));
        Ok(())
    }

    fn enable(&self, service: &str) -> Result<(), external::Error> {
        record(&self.calls, format!("enable {}", service));
        Ok(())
    }

    fn status(&self, _service: &str) -> ServiceStatus {
        self.status
    }

    fn install_unit(&self, service: &str, unit: &str) -> Result<(), external::Error> {
        record(&self.calls, format!("install-unit {}", service));
        assert!(unit.contains("algod"));
        Ok(())
    }
}

pub struct FakeDiagnostics {
    pub calls: Calls,
    pub status: String,
}

impl Diagnostics for FakeDiagnostics {
    fn telemetry_disable(&self) -> Result<String, external::Error> {
        record(&self.calls, "telemetry disable".to_owned());
        Ok(String::new())
    }

    fn telemetry_enable(&self) -> Result<String, external::Error> {
        record(&self.calls, "telemetry enable".to_owned());
        Ok(String::new())
    }

    fn telemetry_name(&self, name: &str) -> Result<String, external::Error> {
        record(&self.calls, format!("telemetry name {}", name));
        Ok(String::new())
    }

    fn telemetry_status(&self) -> Result<String, external::Error> {
        Ok(self.status.clone())
    }
}

pub struct FakeFetch {
    pub calls: Calls,
}

impl Fetch for FakeFetch {
    fn get(&self, url: &str) -> Result<Vec<u8>, external::Error> {
        record(&self.calls, format!("get {}", url));
        if url.ends_with("genesis.json") {
            Ok(GENESIS.as_bytes().to_vec())
        } else {
            Ok(b"-----BEGIN PGP PUBLIC KEY BLOCK-----".to_vec())
        }
    }
}

pub struct FakeChecks {
    pub system_ok: bool,
}

impl RequirementsCheck for FakeChecks {
    fn check_system(&self) -> Result<(), external::Error> {
        if self.system_ok {
            Ok(())
        } else {
            Err(failure("not enough memory"))
        }
    }

    fn check_permissions(&self, _install_dir: &Path) -> Result<Vec<String>, external::Error> {
        Ok(vec!["port 8080 is already in use".to_owned()])
    }
}

/// Doubles for a host where everything works, the node stays up and
/// telemetry ends up disabled.
pub struct Host {
    pub calls: Calls,
    pub failing_package: Option<&'static str>,
    pub service_status: ServiceStatus,
    pub telemetry_status: String,
    pub system_ok: bool,
}

impl Default for Host {
    fn default() -> Self {
        Host {
            calls: Arc::new(Mutex::new(Vec::new())),
            failing_package: None,
            service_status: ServiceStatus::Running,
            telemetry_status: "Remote logging is currently disabled".to_owned(),
            system_ok: true,
        }
    }
}

impl Host {
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            packages: Box::new(FakePackages {
                calls: Arc::clone(&self.calls),
                failing_package: self.failing_package,
            }),
            services: Box::new(FakeServices {
                calls: Arc::clone(&self.calls),
                status: self.service_status,
            }),
            diagnostics: Box::new(FakeDiagnostics {
                calls: Arc::clone(&self.calls),
                status: self.telemetry_status.clone(),
            }),
            fetcher: Box::new(FakeFetch {
                calls: Arc::clone(&self.calls),
            }),
            checks: Box::new(FakeChecks {
                system_ok: self.system_ok,
            }),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

/// Settings placing every directory under `root`.
pub fn settings_in(root: &Path) -> InstallSettings {
    InstallSettings {
        install_dir: root.join("install"),
        data_dir: root.join("data"),
        bin_dir: root.join("bin"),
        network: Network::Testnet,
        relay: false,
        archival: false,
        telemetry: false,
    }
}

pub fn options_in(root: &Path) -> InstallOptions {
    InstallOptions {
        service_name: "algorand".to_owned(),
        service_user: "alice".to_owned(),
        service_group: "alice".to_owned(),
        home_dir: Some(root.join("home")),
        home_owner: None,
        telemetry_name: Some("node-1".to_owned()),
        restart_delay: Duration::from_millis(0),
    }
}
