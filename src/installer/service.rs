use std::collections::HashMap;
use std::fs;
use std::io::{self, Write as _};
use std::path::Path;

const UNIT_TEMPLATE: &str = r#"[Unit]
Description=Algorand daemon under {{ .DataDir }}
After=network-online.target
Wants=network-online.target

[Service]
ExecStart={{ .BinDir }}/algod -d {{ .DataDir }}
PIDFile={{ .DataDir }}/algod.pid
User={{ .User }}
Group={{ .Group }}
Restart=always
RestartSec=5s
ProtectSystem=false

[Install]
WantedBy=multi-user.target
"#;

pub const DATA_DIR_VARIABLE: &str = "ALGORAND_DATA";

/// The systemd unit running the node from `bin_dir` on `data_dir`.
pub fn render_unit(
    data_dir: &Path,
    bin_dir: &Path,
    user: &str,
    group: &str,
) -> Result<String, String> {
    let mut context: HashMap<String, String> = HashMap::new();
    context.insert("DataDir".to_owned(), data_dir.display().to_string());
    context.insert("BinDir".to_owned(), bin_dir.display().to_string());
    context.insert("User".to_owned(), user.to_owned());
    context.insert("Group".to_owned(), group.to_owned());
    gtmpl::template(UNIT_TEMPLATE, context).map_err(|error| error.to_string())
}

/// Appends `export ALGORAND_DATA=<data_dir>` to a shell profile unless it is
/// already there. Returns whether the profile changed.
pub fn export_data_dir(profile: &Path, data_dir: &Path) -> io::Result<bool> {
    let line = format!("export {}={}", DATA_DIR_VARIABLE, data_dir.display());
    let existing = match fs::read_to_string(profile) {
        Ok(content) => content,
        Err(error) if error.kind() == io::ErrorKind::NotFound => String::new(),
        Err(error) => return Err(error),
    };
    if existing.lines().any(|l| l.trim() == line) {
        return Ok(false);
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(profile)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{}", line)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use predicates::prelude::*;

    #[test]
    fn unit_is_templated() {
        let unit = render_unit(
            Path::new("/var/lib/algorand"),
            Path::new("/usr/bin"),
            "alice",
            "staff",
        )
        .unwrap();
        assert!(unit.contains("ExecStart=/usr/bin/algod -d /var/lib/algorand\n"));
        assert!(unit.contains("User=alice\n"));
        assert!(unit.contains("Group=staff\n"));
        assert!(!unit.contains("{{"));
    }

    #[test]
    fn export_is_added_once() {
        let temp_dir = TempDir::new().unwrap();
        let bashrc = temp_dir.child(".bashrc");
        bashrc.write_str("alias ll='ls -l'").unwrap();

        let data_dir = Path::new("/var/lib/algorand");
        assert!(export_data_dir(bashrc.path(), data_dir).unwrap());
        assert!(!export_data_dir(bashrc.path(), data_dir).unwrap());

        bashrc.assert("alias ll='ls -l'\nexport ALGORAND_DATA=/var/lib/algorand\n");
    }

    #[test]
    fn missing_profile_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let bashrc = temp_dir.child(".bashrc");
        assert!(export_data_dir(bashrc.path(), Path::new("/data")).unwrap());
        bashrc.assert(predicate::str::contains("export ALGORAND_DATA=/data"));
    }
}
