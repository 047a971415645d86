fn main() {
    println!("cargo:rerun-if-env-changed=GO_ENGINE_LIB_DIR");
    if std::env::var_os("CARGO_FEATURE_NATIVE_ENGINE").is_some() {
        if let Ok(dir) = std::env::var("GO_ENGINE_LIB_DIR") {
            println!("cargo:rustc-link-search=native={dir}");
        }
        println!("cargo:rustc-link-lib=dylib=get_input");
    }
}
