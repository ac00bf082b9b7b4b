fn main() {
    std::process::exit(match snapvtk::cli::run_snapvtk(std::env::args_os()) {
        Ok(_) => 0,
        Err(_) => 1,
    });
}
