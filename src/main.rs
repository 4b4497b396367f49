fn main() {
    if let Err(err) = intent_tags::editor::run_interactive() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
