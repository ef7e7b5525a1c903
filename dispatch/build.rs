use std::env;
use std::path::PathBuf;
use std::process::Command;

const FIXTURE: &str = "tests/fixtures/physics.rs";

// Compiles the physics fixture into a shared library for the native dispatch
// tests and exposes its path as CCPP_FIXTURE_LIB.
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={FIXTURE}");

    // The fixture is loaded by the test binary, so it must match the host.
    if env::var("TARGET").ok() != env::var("HOST").ok() {
        return;
    }

    let rustc = env::var("RUSTC").expect("missing RUSTC");
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("missing manifest dir"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("missing OUT_DIR"));
    let output = out_dir.join(format!(
        "{}ccpp_fixture{}",
        env::consts::DLL_PREFIX,
        env::consts::DLL_SUFFIX
    ));

    let status = Command::new(rustc)
        .args(["--edition", "2024", "--crate-type", "cdylib"])
        .args(["--crate-name", "ccpp_fixture"])
        .arg("-o")
        .arg(&output)
        .arg(manifest_dir.join(FIXTURE))
        .status();

    match status {
        Ok(status) if status.success() => {
            println!("cargo:rustc-env=CCPP_FIXTURE_LIB={}", output.display());
        }
        _ => println!("cargo:warning=physics fixture did not build; native dispatch tests are skipped"),
    }
}
