use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    // The linker script includes memory.x from the search path; the
    // .framebuffer section it declares must be visible to every build.
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
    fs::copy("memory.x", out.join("memory.x")).unwrap();
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}
