fn main() {
    if let Err(error) = datalens::run() {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
