use std::process::Command as ProcCommand;

use serde_json::Value;
use tempfile::TempDir;

fn base_cmd(data_dir: &TempDir) -> ProcCommand {
    let mut command = ProcCommand::new(env!("CARGO_BIN_EXE_quotes"));

    command
        .env("DOTENV_PATH", data_dir.path().join("missing.env"))
        .env("RUST_LOG", "warn")
        .arg("--data-dir")
        .arg(data_dir.path());

    command
}

fn export(data_dir: &TempDir) -> Vec<Value> {
    let output = base_cmd(data_dir)
        .arg("export")
        .output()
        .expect("run export");
    assert!(output.status.success());
    serde_json::from_slice::<Value>(&output.stdout)
        .expect("export prints JSON")
        .as_array()
        .cloned()
        .expect("export prints an array")
}

#[test]
fn e2e_seed_then_export() {
    let data_dir = TempDir::new().expect("temp dir");

    assert!(export(&data_dir).is_empty());

    let output = base_cmd(&data_dir).arg("seed").output().expect("run seed");
    assert!(output.status.success());
    assert!(data_dir.path().join("quotes.sqlite").exists());

    let quotes = export(&data_dir);
    assert_eq!(quotes.len(), 3);
    assert_eq!(quotes[0]["author"], "Albert Einstein");
    assert_eq!(quotes[1]["author"], "Mahatma Gandhi");
    assert_eq!(quotes[2]["text"], "Be yourself; everyone else is already taken.");
    assert!(quotes.iter().all(|q| q["rating"] == 1));

    // seeding a populated store is a no-op
    let output = base_cmd(&data_dir).arg("seed").output().expect("run seed");
    assert!(output.status.success());
    assert_eq!(export(&data_dir).len(), 3);
}

#[test]
fn e2e_reset_drops_existing_quotes() {
    let data_dir = TempDir::new().expect("temp dir");

    let output = base_cmd(&data_dir).arg("seed").output().expect("run seed");
    assert!(output.status.success());
    assert_eq!(export(&data_dir).len(), 3);

    let output = base_cmd(&data_dir)
        .arg("--reset")
        .arg("export")
        .output()
        .expect("run export with reset");
    assert!(output.status.success());
    let quotes: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(quotes, Value::Array(Vec::new()));
}

#[test]
fn e2e_daemon_exits_with_error_when_listen_address_is_taken() {
    let data_dir = TempDir::new().expect("temp dir");
    let taken = std::net::TcpListener::bind("127.0.0.1:0").expect("bind placeholder");
    let addr = taken.local_addr().expect("placeholder addr");

    let mut child = base_cmd(&data_dir)
        .arg("--api-listen")
        .arg(addr.to_string())
        .spawn()
        .expect("start daemon");

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(20);
    let status = loop {
        if let Some(status) = child.try_wait().expect("poll daemon") {
            break status;
        }
        if std::time::Instant::now() > deadline {
            child.kill().ok();
            panic!("daemon kept running with {addr} already bound");
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    };
    assert!(!status.success());
}
