fn main() {
    if let Err(e) = vigil_lib::run() {
        eprintln!("vigil: {}", e);
        std::process::exit(1);
    }
}
