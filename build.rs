const REGISTRY_PROTO: &str = "proto/registry/v1/registry.proto";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed={}", REGISTRY_PROTO);

    // Build scripts see features through the environment, not cfg!
    if std::env::var_os("CARGO_FEATURE_RPC").is_none() {
        return Ok(());
    }
    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .compile(&[REGISTRY_PROTO], &["proto"])?;
    Ok(())
}
