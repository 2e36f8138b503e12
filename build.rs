use std::env;
use std::path::PathBuf;

// ffmpeg-next links against system FFmpeg. Linux and macOS find it through
// pkg-config; on Windows the usual source is a vcpkg install, which is only
// picked up reliably when FFMPEG_DIR points at it.
fn main() {
    for variable in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    let windows = env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "windows");
    if !windows || env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!("cargo:warning=FFMPEG_DIR is not set; point it at an FFmpeg install (e.g. from vcpkg).");
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate = PathBuf::from(vcpkg_root).join("installed").join(triplet);

    if candidate.exists() {
        println!(
            "cargo:warning=Found vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to use it explicitly.",
            candidate.display()
        );
    } else {
        println!(
            "cargo:warning=No FFmpeg found under {}; set FFMPEG_DIR.",
            candidate.display()
        );
    }
}
