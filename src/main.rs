fn main() {
    if let Err(err) = map_label_declutter::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
