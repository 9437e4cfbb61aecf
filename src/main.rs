fn main() {
    if let Err(err) = trace_dependency_diagram::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
