// build script: compile the shrex/nd wire schema with prost-build.

fn main() {
    println!("cargo:rerun-if-changed=proto/shrex_nd.proto");

    prost_build::Config::new()
        .out_dir(std::env::var("OUT_DIR").expect("OUT_DIR set by cargo"))
        .compile_protos(&["proto/shrex_nd.proto"], &["proto"])
        .expect("failed to compile proto/shrex_nd.proto");
}
