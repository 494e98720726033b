fn main() {
    if let Err(err) = moldshop_report::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
