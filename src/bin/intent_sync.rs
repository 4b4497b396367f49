//! Remote sync client binary; all logic lives in `intent_tags::sync`.

fn main() {
    if let Err(err) = intent_tags::sync::run_interactive() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
