use crate::external::{self, PackageManager};

/// Needed by the installation itself, any failure stops it.
pub const ESSENTIAL_PACKAGES: &[&str] = &[
    "curl",
    "gnupg2",
    "software-properties-common",
    "sqlite3",
    "net-tools",
];

/// Handy for operating a node, installed when possible.
pub const OPTIONAL_PACKAGES: &[&str] = &["jq", "screen", "ntp"];

pub fn missing<'a>(packages: &dyn PackageManager, wanted: &[&'a str]) -> Vec<&'a str> {
    wanted
        .iter()
        .copied()
        .filter(|package| !packages.is_installed(package))
        .collect()
}

/// Installs the missing essential and optional packages.
///
/// Returns warnings for the optional packages that could not be installed.
pub fn install_dependencies(packages: &dyn PackageManager) -> Result<Vec<String>, external::Error> {
    let essential = missing(packages, ESSENTIAL_PACKAGES);
    let optional = missing(packages, OPTIONAL_PACKAGES);
    if essential.is_empty() && optional.is_empty() {
        tracing::info!("all dependencies are already installed");
        return Ok(Vec::new());
    }

    packages.update_index()?;

    if !essential.is_empty() {
        tracing::info!(packages = %essential.join(", "), "installing essential packages");
        packages.install(&essential)?;
    }

    let mut warnings = Vec::new();
    if !optional.is_empty() {
        tracing::info!(packages = %optional.join(", "), "installing recommended packages");
        if let Err(error) = packages.install(&optional) {
            tracing::warn!(reason = %error, "some optional packages could not be installed");
            warnings.push(format!(
                "optional packages not installed ({}): {}",
                optional.join(", "),
                error
            ));
        }
    }
    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::AptRepository;
    use std::cell::RefCell;

    struct FakeApt {
        installed: Vec<&'static str>,
        fail_optional: bool,
        calls: RefCell<Vec<String>>,
    }

    impl FakeApt {
        fn new(installed: Vec<&'static str>, fail_optional: bool) -> Self {
            FakeApt {
                installed,
                fail_optional,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl PackageManager for FakeApt {
        fn update_index(&self) -> Result<(), external::Error> {
            self.calls.borrow_mut().push("update".to_owned());
            Ok(())
        }

        fn is_installed(&self, package: &str) -> bool {
            self.installed.contains(&package)
        }

        fn install(&self, packages: &[&str]) -> Result<(), external::Error> {
            self.calls
                .borrow_mut()
                .push(format!("install {}", packages.join(" ")));
            if self.fail_optional && packages.contains(&"jq") {
                return Err(external::Error::Requirement("no candidate".to_owned()));
            }
            Ok(())
        }

        fn add_repository(&self, _repository: &AptRepository) -> Result<(), external::Error> {
            Ok(())
        }
    }

    #[test]
    fn nothing_to_do_when_everything_is_installed() {
        let all = ESSENTIAL_PACKAGES
            .iter()
            .chain(OPTIONAL_PACKAGES)
            .copied()
            .collect();
        let apt = FakeApt::new(all, false);
        assert!(install_dependencies(&apt).unwrap().is_empty());
        assert!(apt.calls.borrow().is_empty());
    }

    #[test]
    fn only_missing_packages_are_installed() {
        let apt = FakeApt::new(vec!["curl", "gnupg2", "jq", "screen", "ntp"], false);
        assert_eq!(missing(&apt, ESSENTIAL_PACKAGES), vec![
            "software-properties-common",
            "sqlite3",
            "net-tools"
        ]);
        install_dependencies(&apt).unwrap();
        assert_eq!(*apt.calls.borrow(), vec![
            "update".to_owned(),
            "install software-properties-common sqlite3 net-tools".to_owned(),
        ]);
    }

    #[test]
    fn optional_failure_is_a_warning() {
        let apt = FakeApt::new(ESSENTIAL_PACKAGES.to_vec(), true);
        let warnings = install_dependencies(&apt).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("jq, screen, ntp"));
    }
}
