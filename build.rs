use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=MYSQLCLIENT_LIB_DIR");

    // The in-process engine needs nothing from the system.
    if env::var_os("CARGO_FEATURE_LIBMYSQLCLIENT").is_none() {
        return;
    }

    // Optional override for dev/CI: dir containing libmysqlclient.{so,dylib} or mysqlclient.lib
    if let Ok(dir) = env::var("MYSQLCLIENT_LIB_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
    }

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "windows" {
        println!("cargo:rustc-link-lib=dylib=libmysql");
    } else {
        println!("cargo:rustc-link-lib=dylib=mysqlclient");
    }
}
