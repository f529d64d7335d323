use super::settings::{InstallOptions, InstallSettings};

/// What to do once the node is installed.
pub fn next_steps(settings: &InstallSettings, options: &InstallOptions) -> String {
    let data_dir = settings.data_dir.display();
    let service = &options.service_name;
    let diagcfg = format!("sudo -u {} -H -E diagcfg telemetry", options.service_user);
    let profile = match &options.home_dir {
        Some(home) => format!("is set in {}", home.join(".bashrc").display()),
        None => "was not exported, no home directory was found".to_owned(),
    };
    let telemetry = if settings.telemetry {
        "enabled"
    } else {
        "disabled"
    };
    format!(
        "\
Algorand node installation complete!

Important notes:
1. The {network} node is installed and running with data directory {data_dir}
2. The ALGORAND_DATA environment variable {profile}
3. Telemetry is {telemetry}

To enable telemetry with a host name:
  {diagcfg} name -n <hostname>
  sudo systemctl restart {service}

To disable telemetry:
  {diagcfg} disable
  sudo systemctl restart {service}

To check telemetry status:
  {diagcfg}

Useful commands:
- Node status: goal node status -d {data_dir}
- Service control: sudo systemctl start|stop|restart {service}
- Participation keys: algoinstall partkey list -d {data_dir}
",
        network = settings.network,
        data_dir = data_dir,
        profile = profile,
        telemetry = telemetry,
        diagcfg = diagcfg,
        service = service,
    )
}
