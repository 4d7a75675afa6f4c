use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_path = Path::new("proto/engine.proto");

    println!("cargo:rerun-if-changed={}", proto_path.display());

    // Build hosts are not expected to ship protoc.
    let protoc = protoc_bin_vendored::protoc_bin_path()?;
    // SAFETY: build scripts are single-threaded at this point.
    unsafe { std::env::set_var("PROTOC", protoc) };

    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .compile_protos(&[proto_path], &[Path::new("proto")])?;

    Ok(())
}
