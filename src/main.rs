fn main() {
    if let Err(err) = sheet_clean::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
