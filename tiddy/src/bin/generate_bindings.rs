//! Generate UniFFI Kotlin bindings for NotiTiddy
//!
//! Run: cargo run --bin generate-bindings
//!
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │ DEPENDENCY MAP - Output paths must match the Android shell's Gradle setup   │
//! │                                                                             │
//! │ Inputs:                                                                     │
//! │   target/release/libtiddy.so         ← Built library for bindgen            │
//! │                                                                             │
//! │ Outputs:                                                                    │
//! │   app/src/main/java/uniffi/tiddy/tiddy.kt  ← Kotlin bindings                │
//! │   app/src/main/jniLibs/<abi>/libtiddy.so   ← Per-ABI shared libraries       │
//! └─────────────────────────────────────────────────────────────────────────────┘

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Android ABI directory → Rust target triple
const ANDROID_TARGETS: &[(&str, &str)] = &[
    ("arm64-v8a", "aarch64-linux-android"),
    ("armeabi-v7a", "armv7-linux-androideabi"),
    ("x86_64", "x86_64-linux-android"),
];

fn main() {
    let rust_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let project_root = rust_dir.parent().expect("No parent directory");

    println!("Building Rust library...");
    run_cmd("cargo", &["build", "--release"], &rust_dir);

    println!("Generating Kotlin bindings...");
    run_cmd(
        "cargo",
        &[
            "run",
            "--bin",
            "uniffi-bindgen",
            "generate",
            "--library",
            "target/release/libtiddy.so",
            "--language",
            "kotlin",
            "--out-dir",
            "generated",
        ],
        &rust_dir,
    );

    let kotlin_dest = project_root.join("app/src/main/java/uniffi/tiddy");
    let jni_dest = project_root.join("app/src/main/jniLibs");
    let generated = rust_dir.join("generated/uniffi/tiddy");

    println!("Copying generated Kotlin file...");
    fs::create_dir_all(&kotlin_dest).expect("Create Kotlin source dir");
    fs::copy(generated.join("tiddy.kt"), kotlin_dest.join("tiddy.kt")).expect("Copy Kotlin bindings");

    // Cross-compile for every ABI the app ships (needs cargo-ndk on PATH)
    println!("Building Android shared libraries...");
    for (abi, target) in ANDROID_TARGETS {
        run_cmd(
            "cargo",
            &["ndk", "--target", target, "build", "--release"],
            &rust_dir,
        );
        let abi_dir = jni_dest.join(abi);
        fs::create_dir_all(&abi_dir).expect("Create jniLibs dir");
        let built = rust_dir.join(format!("target/{}/release/libtiddy.so", target));
        fs::copy(&built, abi_dir.join("libtiddy.so")).expect("Copy shared library");
    }

    println!("Done! Bindings regenerated successfully.");
    println!("Generated files:");
    println!("  - {}/tiddy.kt (UniFFI generated)", kotlin_dest.display());
    for (abi, _) in ANDROID_TARGETS {
        println!("  - {}/{}/libtiddy.so", jni_dest.display(), abi);
    }
}

fn run_cmd(program: &str, args: &[&str], dir: &Path) {
    let status = Command::new(program)
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap_or_else(|e| panic!("Failed to run {}: {}", program, e));

    if !status.success() {
        panic!("{} failed with status: {}", program, status);
    }
}
