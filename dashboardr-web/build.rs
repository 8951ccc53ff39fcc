//! Bakes `runtime.json` into the bundle. A missing file falls back to `{}`,
//! since every configuration field has a default.

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=runtime.json");

    let (Some(out_dir), Some(manifest_dir)) =
        (env::var_os("OUT_DIR"), env::var_os("CARGO_MANIFEST_DIR"))
    else {
        println!("cargo:warning=OUT_DIR or CARGO_MANIFEST_DIR is not set");
        return;
    };
    let dest = PathBuf::from(out_dir).join("runtime.json");
    let config = fs::read_to_string(PathBuf::from(manifest_dir).join("runtime.json"))
        .unwrap_or_else(|_| "{}".to_string());

    if let Err(err) = fs::write(&dest, config) {
        println!("cargo:warning=Failed to write {}: {err}", dest.display());
    }
}
