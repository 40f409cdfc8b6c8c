use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use approx::assert_relative_eq;
use np_hist::{Histogram, JsonContainer};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_nextplot"))
}

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("nextplot_cli_{}_{}_{}", std::process::id(), nanos, name));
    std::fs::create_dir_all(&p).unwrap();
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn write_sample(dir: &Path, file: &str, contents: &[f64], sow: f64) {
    let edges: Vec<f64> = (0..=contents.len()).map(|i| i as f64).collect();
    let mut c = JsonContainer::default();
    c.objects.insert("hMass".into(), Histogram::from_contents("hMass", edges, contents).unwrap());
    c.objects.insert(
        "sumOfWeights".into(),
        Histogram::from_contents("sumOfWeights", vec![0.0, 1.0], &[sow]).unwrap(),
    );
    c.write(&dir.join(file)).unwrap();
}

/// Catalog with two simulated samples, one unreadable file and a composite.
fn fixture(name: &str) -> PathBuf {
    let dir = tmp_dir(name);
    write_sample(&dir, "zz.json", &[1.0, 3.0], 2.0);
    write_sample(&dir, "wz.json", &[2.0, 2.0], 4.0);
    std::fs::write(dir.join("broken.json"), "not json").unwrap();

    let catalog = dir.join("catalog.yaml");
    std::fs::write(
        &catalog,
        r#"
sum_of_weights: { object_name: sumOfWeights, bin_index: 1 }
sources:
  - { name: zz, path: zz.json, cross_section: 4.0, luminosity: 10.0 }
  - { name: wz, path: wz.json, cross_section: 2.0, luminosity: 10.0 }
  - { name: broken, path: broken.json }
collections:
  - { key: zz, title: ZZ, sources: [zz], sum_of_weights: true }
  - { key: wz, title: WZ, sources: [wz], sum_of_weights: true }
  - { key: broken, sources: [broken] }
composites:
  - { key: diboson, title: Diboson, members: [zz, wz], scale_factor: 0.5 }
"#,
    )
    .unwrap();
    catalog
}

fn stdout_json(out: &Output) -> serde_json::Value {
    assert!(
        out.status.success(),
        "command should succeed, stderr={}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("stdout should be JSON")
}

#[test]
fn list_reports_entries_and_sources() {
    let catalog = fixture("list");
    let v = stdout_json(&run(&["list", "--catalog", catalog.to_string_lossy().as_ref()]));

    let entries = v["entries"].as_array().unwrap();
    let keys: Vec<&str> = entries.iter().map(|e| e["key"].as_str().unwrap()).collect();
    assert_eq!(keys, vec!["zz", "wz", "broken", "diboson"]);
    assert_eq!(entries[3]["kind"], "composite");
    assert_eq!(entries[3]["size"], 2);
    assert_eq!(v["sources"].as_array().unwrap().len(), 3);
}

#[test]
fn combine_writes_normalized_composite() {
    let catalog = fixture("combine");
    let out_dir = catalog.parent().unwrap().to_path_buf();
    let out_file = out_dir.join("diboson.json");

    let out = run(&[
        "combine",
        "--catalog",
        catalog.to_string_lossy().as_ref(),
        "--key",
        "diboson",
        "--object",
        "hMass",
        "--by-xs",
        "--by-lumi",
        "--by-sow",
        "--output",
        out_file.to_string_lossy().as_ref(),
    ]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out_file).unwrap()).unwrap();
    // zz: (1, 3) * 4 / 2 * 10 = (20, 60); wz: (2, 2) * 2 / 4 * 10 = (10, 10); sum * 0.5
    let contents = v["histogram"]["bin_content"].as_array().unwrap();
    assert_relative_eq!(contents[0].as_f64().unwrap(), 15.0);
    assert_relative_eq!(contents[1].as_f64().unwrap(), 35.0);
    assert_eq!(v["histogram"]["title"], "Diboson");
    assert_relative_eq!(v["integral"].as_f64().unwrap(), 50.0);

    let unit = stdout_json(&run(&[
        "combine",
        "--catalog",
        catalog.to_string_lossy().as_ref(),
        "--key",
        "diboson",
        "--object",
        "hMass",
        "--by-xs",
        "--unit",
    ]));
    assert_relative_eq!(unit["integral"].as_f64().unwrap(), 1.0);

    let _ = std::fs::remove_dir_all(&out_dir);
}

#[test]
fn combine_fails_on_unknown_key_and_empty_result() {
    let catalog = fixture("fail");
    let catalog_arg = catalog.to_string_lossy().to_string();

    let out = run(&["combine", "--catalog", &catalog_arg, "--key", "ttbar", "--object", "hMass"]);
    assert!(!out.status.success(), "unknown key should fail");

    let out = run(&["combine", "--catalog", &catalog_arg, "--key", "broken", "--object", "hMass"]);
    assert!(!out.status.success(), "unreadable source should fail without --skip-bad");

    let out = run(&[
        "combine",
        "--catalog",
        &catalog_arg,
        "--key",
        "broken",
        "--object",
        "hMass",
        "--skip-bad",
    ]);
    assert!(!out.status.success(), "no contributing source should fail");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("no source of 'broken' contributed object 'hMass'"),
        "stderr={}",
        stderr
    );

    let _ = std::fs::remove_dir_all(catalog.parent().unwrap());
}
