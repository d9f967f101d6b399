use std::env;
use std::fs::File;
use std::path::PathBuf;

use gl_generator::{Api, Fallbacks, GlobalGenerator, Profile, Registry};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let mut bindings = File::create(out_dir.join("bindings.rs")).unwrap();
    // Core 3.3 for glProvokingVertex, which flat shading relies on.
    Registry::new(Api::Gl, (3, 3), Profile::Core, Fallbacks::All, [])
        .write_bindings(GlobalGenerator, &mut bindings)
        .unwrap();
    println!("cargo:rerun-if-changed=build.rs");
}
