use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::Result;
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_sensor-gapfill");

fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    // ---
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

/// Run the binary inside `dir` with only the given configuration variables set.
fn run_gapfill(dir: &Path, vars: &[(&str, &OsStr)]) -> Output {
    // ---
    let mut cmd = Command::new(BIN);
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env("GAPFILL_LOG_LEVEL", "warn")
        .env("FORCE_COLOR", "0");
    for key in [
        "PRIMARY_CSV",
        "SECONDARY_CSV",
        "OUTPUT_CSV",
        "TIME_COLUMN",
        "SECONDARY_TIME_COLUMN",
        "TRACKED_PARAMS",
        "CARRY_COLUMNS",
        "SAMPLE_INTERVAL_SECS",
        "EMIT_PROVENANCE",
        "REPORT_JSON",
        "PLOT_SVG",
    ] {
        cmd.env_remove(key);
    }
    for (key, value) in vars {
        cmd.env(key, value);
    }
    cmd.output().expect("failed to launch sensor-gapfill")
}

const PRIMARY: &str = "\
Sno,time,p,rh,temp,temp_soil,devEUI
1,2024-02-10T00:00:00.000000Z,1012.1,61.0,21.4,18.2,70b3d5
2,2024-02-10T00:06:00.000000Z,0,60.5,21.3,18.2,70b3d5
3,2024-02-10T00:18:00.000000Z,1012.4,60.1,21.0,18.1,70b3d5
";

const SECONDARY: &str = "\
Sno,time,p,rh,temp,temp_soil,DevEUI
2,2024-02-10T00:06:00.000000Z,1012.2,60.5,21.3,18.2,70b3d5
9,2024-02-10T00:12:00.000000Z,0,,5.0,0.0,70b3d5
";

#[test]
fn fills_gap_and_patches_from_secondary() -> Result<()> {
    // ---
    let dir = TempDir::new()?;
    let primary = write_file(dir.path(), "influx.csv", PRIMARY);
    let secondary = write_file(dir.path(), "simcard.csv", SECONDARY);
    let output = dir.path().join("update.csv");
    let report = dir.path().join("report.json");

    let out = run_gapfill(
        dir.path(),
        &[
            ("PRIMARY_CSV", primary.as_os_str()),
            ("SECONDARY_CSV", secondary.as_os_str()),
            ("OUTPUT_CSV", output.as_os_str()),
            ("REPORT_JSON", report.as_os_str()),
            ("EMIT_PROVENANCE", OsStr::new("true")),
        ],
    );
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let body = std::fs::read_to_string(&output)?;
    let lines: Vec<_> = body.lines().collect();
    assert_eq!(lines[0], "time,p,rh,temp,temp_soil,origin");
    assert_eq!(
        lines[1..],
        [
            "2024-02-10T00:00:00.000000Z,1012.1,61.0,21.4,18.2,primary",
            "2024-02-10T00:06:00.000000Z,1012.2,60.5,21.3,18.2,patched",
            "2024-02-10T00:12:00.000000Z,0.0,0.0,5.0,0.0,patched",
            "2024-02-10T00:18:00.000000Z,1012.4,60.1,21.0,18.1,primary",
        ]
    );

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report)?)?;
    assert_eq!(json["gaps_inserted"], 1);
    assert_eq!(json["readings_patched"], 2);
    assert_eq!(json["unresolved"]["rh"], 1);
    assert_eq!(json["output_rows"], 4);

    Ok(())
}

#[test]
fn runs_without_secondary_and_carries_metadata() -> Result<()> {
    // ---
    let dir = TempDir::new()?;
    let primary = write_file(dir.path(), "influx.csv", PRIMARY);

    let out = run_gapfill(
        dir.path(),
        &[
            ("PRIMARY_CSV", primary.as_os_str()),
            ("CARRY_COLUMNS", OsStr::new("devEUI")),
        ],
    );
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    // Default output name, relative to the working directory
    let body = std::fs::read_to_string(dir.path().join("update.csv"))?;
    let lines: Vec<_> = body.lines().collect();
    assert_eq!(lines[0], "time,p,rh,temp,temp_soil,devEUI");
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[2], "2024-02-10T00:06:00.000000Z,0.0,60.5,21.3,18.2,70b3d5");
    assert_eq!(lines[3], "2024-02-10T00:12:00.000000Z,0.0,0.0,0.0,0.0,70b3d5");

    Ok(())
}

#[test]
fn bad_timestamp_aborts_without_output() -> Result<()> {
    // ---
    let dir = TempDir::new()?;
    let primary = write_file(
        dir.path(),
        "influx.csv",
        "time,p,rh,temp,temp_soil\n\
         2024-02-10T00:00:00Z,1,2,3,4\n\
         not-a-time,1,2,3,4\n",
    );
    let output = dir.path().join("update.csv");

    let out = run_gapfill(
        dir.path(),
        &[
            ("PRIMARY_CSV", primary.as_os_str()),
            ("OUTPUT_CSV", output.as_os_str()),
        ],
    );

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("influx.csv"), "stderr: {stderr}");
    assert!(stderr.contains("line 3"), "stderr: {stderr}");
    assert!(!output.exists());

    Ok(())
}

#[test]
fn bad_secondary_timestamp_aborts_without_output() -> Result<()> {
    // ---
    let dir = TempDir::new()?;
    let primary = write_file(dir.path(), "influx.csv", PRIMARY);
    let secondary = write_file(
        dir.path(),
        "simcard.csv",
        "time,p,rh,temp,temp_soil\n\
         2024-02-10T00:12:00Z,1012.2,60.5,21.3,18.2\n\
         12:18,1012.2,60.5,21.3,18.2\n",
    );
    let output = dir.path().join("update.csv");

    let out = run_gapfill(
        dir.path(),
        &[
            ("PRIMARY_CSV", primary.as_os_str()),
            ("SECONDARY_CSV", secondary.as_os_str()),
            ("OUTPUT_CSV", output.as_os_str()),
        ],
    );

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("simcard.csv"), "stderr: {stderr}");
    assert!(stderr.contains("line 3"), "stderr: {stderr}");
    assert!(!output.exists());

    Ok(())
}

#[test]
fn secondary_missing_column_aborts_without_output() -> Result<()> {
    // ---
    let dir = TempDir::new()?;
    let primary = write_file(dir.path(), "influx.csv", PRIMARY);
    let secondary = write_file(
        dir.path(),
        "simcard.csv",
        "time,p,rh,temp\n2024-02-10T00:12:00Z,1012.2,60.5,21.3\n",
    );
    let output = dir.path().join("update.csv");

    let out = run_gapfill(
        dir.path(),
        &[
            ("PRIMARY_CSV", primary.as_os_str()),
            ("SECONDARY_CSV", secondary.as_os_str()),
            ("OUTPUT_CSV", output.as_os_str()),
        ],
    );

    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("simcard.csv"), "stderr: {stderr}");
    assert!(stderr.contains("temp_soil"), "stderr: {stderr}");
    assert!(!output.exists());

    Ok(())
}

#[test]
fn missing_secondary_file_aborts_without_output() -> Result<()> {
    // ---
    let dir = TempDir::new()?;
    let primary = write_file(dir.path(), "influx.csv", PRIMARY);
    let secondary = dir.path().join("simcard.csv");
    let output = dir.path().join("update.csv");

    let out = run_gapfill(
        dir.path(),
        &[
            ("PRIMARY_CSV", primary.as_os_str()),
            ("SECONDARY_CSV", secondary.as_os_str()),
            ("OUTPUT_CSV", output.as_os_str()),
        ],
    );

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("simcard.csv"));
    assert!(!output.exists());

    Ok(())
}

#[test]
fn reads_xlsx_primary() -> Result<()> {
    // ---
    let dir = TempDir::new()?;
    let primary = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/readings.xlsx");
    let output = dir.path().join("update.csv");

    let out = run_gapfill(
        dir.path(),
        &[
            ("PRIMARY_CSV", primary.as_os_str()),
            ("OUTPUT_CSV", output.as_os_str()),
            ("TRACKED_PARAMS", OsStr::new("p,temp")),
        ],
    );
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let body = std::fs::read_to_string(&output)?;
    assert_eq!(
        body,
        "time,p,temp\n\
         2024-02-10T00:00:00.000000Z,1012.5,21.0\n\
         2024-02-10T00:06:00.000000Z,0.0,\n"
    );

    Ok(())
}

#[test]
fn empty_primary_writes_header_only() -> Result<()> {
    // ---
    let dir = TempDir::new()?;
    let primary = write_file(dir.path(), "influx.csv", "time,p,rh,temp,temp_soil\n");
    let output = dir.path().join("update.csv");

    let out = run_gapfill(
        dir.path(),
        &[
            ("PRIMARY_CSV", primary.as_os_str()),
            ("OUTPUT_CSV", output.as_os_str()),
        ],
    );

    assert!(out.status.success());
    assert_eq!(std::fs::read_to_string(&output)?, "time,p,rh,temp,temp_soil\n");

    Ok(())
}

#[test]
fn missing_primary_setting_fails() {
    // ---
    let dir = TempDir::new().unwrap();
    let out = run_gapfill(dir.path(), &[]);

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("PRIMARY_CSV"));
}
