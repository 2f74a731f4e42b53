use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=EXTBUF_GHDL_LIB_DIR");
    println!("cargo:rerun-if-env-changed=EXTBUF_GHDL_LIB");

    // Without the ghdl feature the binary drives the reference testbench
    // and nothing external is linked.
    if env::var_os("CARGO_FEATURE_GHDL").is_none() {
        return;
    }

    // The GHDL-elaborated testbench exports ghdl_main. Build it with e.g.
    //   ghdl -a tb_ext_byte_vector.vhd
    //   ghdl -e -shared -Wl,-fPIC tb_ext_byte_vector
    if let Some(dir) = env::var_os("EXTBUF_GHDL_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir.to_string_lossy());
    }
    let lib = env::var("EXTBUF_GHDL_LIB").unwrap_or_else(|_| "tb_ext_byte_vector".to_string());
    println!("cargo:rustc-link-lib={}", lib);
}
