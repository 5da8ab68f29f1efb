//! Links `libespeak-ng` when the `espeak` feature is enabled.
//!
//! Lookup order:
//!
//! 1. `ESPEAK_LIB_DIR`, the directory holding `libespeak-ng.{a,so,dylib}`.
//! 2. `pkg-config espeak-ng` (Homebrew pkgconfig dirs are added on macOS).
//! 3. Well-known library directories of the build host.
//!
//! A static archive is preferred over the shared library.  espeak-ng is
//! written in C++, so static linking also pulls in the C++ runtime.

use std::path::Path;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=ESPEAK_LIB_DIR");
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");

    // Without the backend the crate has no native code to link.
    if std::env::var_os("CARGO_FEATURE_ESPEAK").is_none() {
        return;
    }

    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();

    if let Ok(dir) = std::env::var("ESPEAK_LIB_DIR") {
        if !link_from_dir(&dir, &target_os) {
            panic!("ipafront: ESPEAK_LIB_DIR={dir} holds no libespeak-ng library");
        }
        return;
    }

    if pkg_config(&target_os) {
        return;
    }

    for dir in candidate_dirs(&target_os, &target_arch) {
        if link_from_dir(&dir, &target_os) {
            return;
        }
    }

    panic!(
        "\n\nipafront: the `espeak` feature needs libespeak-ng.\n\
         \n\
         \t  macOS   :  brew install espeak-ng\n\
         \t  Debian  :  sudo apt install libespeak-ng-dev\n\
         \t  Alpine  :  apk add espeak-ng-dev\n\
         \n\
         or set ESPEAK_LIB_DIR to the directory containing the library.\n\n"
    );
}

/// Emit link directives for a library in `dir`; `false` if there is none.
fn link_from_dir(dir: &str, target_os: &str) -> bool {
    let dylib = if target_os == "macos" { "libespeak-ng.dylib" } else { "libespeak-ng.so" };
    let (kind, found) = if Path::new(dir).join("libespeak-ng.a").exists() {
        ("static", true)
    } else {
        ("dylib", Path::new(dir).join(dylib).exists())
    };
    if !found {
        return false;
    }

    println!("cargo:rustc-link-search=native={dir}");
    println!("cargo:rustc-link-lib={kind}=espeak-ng");
    if kind == "static" {
        let cxx = if target_os == "macos" { "c++" } else { "stdc++" };
        println!("cargo:rustc-link-lib=dylib={cxx}");
    }
    true
}

fn pkg_config(target_os: &str) -> bool {
    let mut paths: Vec<String> = Vec::new();
    if target_os == "macos" {
        for prefix in ["/opt/homebrew", "/usr/local"] {
            paths.push(format!("{prefix}/lib/pkgconfig"));
            paths.push(format!("{prefix}/opt/espeak-ng/lib/pkgconfig"));
        }
    }
    if let Ok(existing) = std::env::var("PKG_CONFIG_PATH") {
        paths.push(existing);
    }

    let Ok(out) = Command::new("pkg-config")
        .args(["--libs", "espeak-ng"])
        .env("PKG_CONFIG_PATH", paths.join(":"))
        .output()
    else {
        return false;
    };
    if !out.status.success() {
        return false;
    }

    let Ok(flags) = String::from_utf8(out.stdout) else {
        return false;
    };
    for token in flags.split_whitespace() {
        if let Some(dir) = token.strip_prefix("-L") {
            println!("cargo:rustc-link-search=native={dir}");
        } else if let Some(lib) = token.strip_prefix("-l") {
            println!("cargo:rustc-link-lib=dylib={lib}");
        }
    }
    true
}

fn candidate_dirs(target_os: &str, target_arch: &str) -> Vec<String> {
    let mut dirs: Vec<String> = Vec::new();
    if target_os == "macos" {
        for prefix in ["/opt/homebrew", "/usr/local"] {
            dirs.push(format!("{prefix}/opt/espeak-ng/lib"));
            dirs.push(format!("{prefix}/lib"));
        }
    } else {
        let multiarch = match target_arch {
            "x86_64" => Some("x86_64-linux-gnu"),
            "aarch64" => Some("aarch64-linux-gnu"),
            "arm" => Some("arm-linux-gnueabihf"),
            _ => None,
        };
        if let Some(triple) = multiarch {
            dirs.push(format!("/usr/lib/{triple}"));
        }
        dirs.extend(["/usr/lib64", "/usr/lib", "/usr/local/lib"].map(String::from));
    }
    dirs.retain(|d| Path::new(d).is_dir());
    dirs
}
