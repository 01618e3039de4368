use std::path::PathBuf;
use std::{env, fs};

/// Device credentials are baked in from a `.env` file at build time.
/// `SMARTPLUG_ENV_FILE` overrides the default `./.env`; a missing file
/// yields an empty blob, which the firmware rejects at boot.
fn embed_device_env() {
    println!("cargo:rerun-if-env-changed=SMARTPLUG_ENV_FILE");
    let src = env::var("SMARTPLUG_ENV_FILE").map_or_else(|_| PathBuf::from(".env"), PathBuf::from);
    println!("cargo:rerun-if-changed={}", src.display());

    let contents = fs::read_to_string(&src).unwrap_or_default();
    let out = PathBuf::from(env::var("OUT_DIR").unwrap_or_default()).join("device.env");
    if let Err(e) = fs::write(&out, contents) {
        println!("cargo:warning=could not write {}: {e}", out.display());
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    embed_device_env();
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
