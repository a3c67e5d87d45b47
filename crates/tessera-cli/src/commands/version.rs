//! Version information.

pub fn execute() {
    println!("tessera {}", env!("CARGO_PKG_VERSION"));
}
