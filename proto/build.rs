fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    // Compile proto files to OUT_DIR (used by tonic::include_proto!)
    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(
            &[
                "proto/api/primitive.proto",
                "proto/api/transaction.proto",
                "proto/api/consensus.proto",
                "proto/api/repository.proto",
            ],
            &["proto"],
        )?;

    // Tell Cargo to rerun if proto files change
    println!("cargo:rerun-if-changed=proto/");

    Ok(())
}
