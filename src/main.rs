fn main() {
    if let Err(err) = feedback_ingest::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
