//! Prints the FloatingIP CRD manifest as YAML.
//!
//! Used by packaging pipelines: `cargo run --bin crdgen > floatingip-crd.yaml`

use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&crds::FloatingIP::crd())?);
    Ok(())
}
